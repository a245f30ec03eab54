//! Control-plane command protocol and handler.
//!
//! Commands arrive as SCP messages carried in SDP frames. Every frame laid
//! out little-endian, with lengths counted from the SDP flags byte:
//!
//!   [flags: u8][tag: u8][dest port|cpu: u8][srce port|cpu: u8]
//!   [dest addr: u16][srce addr: u16]                      -- SDP header, 8 bytes
//!   [cmd_rc: u16][seq: u16]                               -- 12 bytes so far
//!   [arg1: u32][arg2: u32][arg3: u32]                     -- 24 bytes, the minimum
//!   [data ...]
//!
//! A reply reuses the request header with source and destination swapped,
//! puts the result code in `cmd_rc`, echoes `seq` and overwrites `arg1..`
//! with its payload. Only get-status carries a payload (seven words).

use crate::config::{
    CMD_DPRI, PACKET_TYPE_MASK_ALL, SCP_MIN_LENGTH, STATUS_WORDS, SubCommand,
};
use crate::engine::Engine;
use crate::monitor::{RouterTimeout, TimeoutKind};
use crate::platform::Platform;
use crate::stats::StatsSnapshot;
use crate::{le_u16_at, le_u32_at, ReinjectError, ReinjectResult, ResultCode};
use core::fmt;
use tracing::{debug, info, warn};

/// SDP header size.
pub const SDP_HEADER_LEN: usize = 8;
/// SDP header plus `cmd_rc` and `seq`: the smallest frame a reply can be built from.
pub const SCP_HEADER_LEN: usize = SDP_HEADER_LEN + 4;
/// Largest SCP data section.
pub const SCP_MAX_DATA: usize = 256;
/// Largest frame the engine accepts.
pub const MAX_FRAME_LEN: usize = SCP_MIN_LENGTH + SCP_MAX_DATA;
/// Largest reply the engine produces (a get-status reply).
pub const MAX_REPLY_LEN: usize = SCP_HEADER_LEN + STATUS_WORDS * 4;

/// Port bits of the port/cpu byte; port 0 carries SCP.
pub const PORT_MASK: u8 = 0xe0;
pub const PORT_SHIFT: u8 = 5;
pub const CPU_MASK: u8 = 0x1f;

/// Flags for a request that expects a reply.
pub const SDP_FLAG_REPLY_EXPECTED: u8 = 0x87;

// -------------------- SDP header --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdpHeader {
    pub flags: u8,
    pub tag: u8,
    pub dest_port_cpu: u8,
    pub srce_port_cpu: u8,
    pub dest_addr: u16,
    pub srce_addr: u16,
}

impl SdpHeader {
    /// Header addressing SCP port 0 of core `cpu` on chip (x, y), sent from
    /// the host (port 7, cpu 31, address 0).
    pub const fn to_core(x: u8, y: u8, cpu: u8) -> Self {
        Self {
            flags: SDP_FLAG_REPLY_EXPECTED,
            tag: 0xff,
            dest_port_cpu: cpu & CPU_MASK,
            srce_port_cpu: 0xff,
            dest_addr: ((x as u16) << 8) | y as u16,
            srce_addr: 0,
        }
    }

    #[inline]
    pub const fn dest_port(&self) -> u8 {
        (self.dest_port_cpu & PORT_MASK) >> PORT_SHIFT
    }

    /// Same header with source and destination exchanged.
    pub const fn swapped(&self) -> Self {
        Self {
            flags: self.flags,
            tag: self.tag,
            dest_port_cpu: self.srce_port_cpu,
            srce_port_cpu: self.dest_port_cpu,
            dest_addr: self.srce_addr,
            srce_addr: self.dest_addr,
        }
    }

    fn decode(bytes: &[u8]) -> ReinjectResult<Self> {
        if bytes.len() < SDP_HEADER_LEN {
            return Err(ReinjectError::Truncated { got: bytes.len() });
        }
        Ok(Self {
            flags: bytes[0],
            tag: bytes[1],
            dest_port_cpu: bytes[2],
            srce_port_cpu: bytes[3],
            dest_addr: le_u16_at!(bytes, 4),
            srce_addr: le_u16_at!(bytes, 6),
        })
    }

    fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.flags;
        out[1] = self.tag;
        out[2] = self.dest_port_cpu;
        out[3] = self.srce_port_cpu;
        out[4..6].copy_from_slice(&self.dest_addr.to_le_bytes());
        out[6..8].copy_from_slice(&self.srce_addr.to_le_bytes());
    }
}

// -------------------- frames --------------------

/// Raw inbound frame as delivered by the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl CommandFrame {
    pub fn from_bytes(data: &[u8]) -> ReinjectResult<Self> {
        if data.len() > MAX_FRAME_LEN {
            return Err(ReinjectError::BufferTooSmall {
                needed: data.len(),
                got: MAX_FRAME_LEN,
            });
        }
        let mut bytes = [0u8; MAX_FRAME_LEN];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFrame")
            .field("len", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// Encoded reply.
#[derive(Clone, PartialEq, Eq)]
pub struct ReplyFrame {
    bytes: [u8; MAX_REPLY_LEN],
    len: usize,
}

impl ReplyFrame {
    fn build(envelope: &ScpEnvelope, code: ResultCode, payload: &[u32]) -> Self {
        let mut bytes = [0u8; MAX_REPLY_LEN];
        envelope.header.swapped().encode_into(&mut bytes);
        bytes[8..10].copy_from_slice(&code.as_u16().to_le_bytes());
        bytes[10..12].copy_from_slice(&envelope.seq.to_le_bytes());
        for (i, word) in payload.iter().enumerate() {
            let off = SCP_HEADER_LEN + i * 4;
            bytes[off..off + 4].copy_from_slice(&word.to_le_bytes());
        }
        Self {
            bytes,
            len: SCP_HEADER_LEN + payload.len() * 4,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn header(&self) -> SdpHeader {
        // A built reply always holds a full header.
        SdpHeader {
            flags: self.bytes[0],
            tag: self.bytes[1],
            dest_port_cpu: self.bytes[2],
            srce_port_cpu: self.bytes[3],
            dest_addr: le_u16_at!(self.bytes, 4),
            srce_addr: le_u16_at!(self.bytes, 6),
        }
    }

    pub fn result_code(&self) -> Option<ResultCode> {
        ResultCode::try_from_u16(le_u16_at!(self.bytes, 8))
    }

    pub fn seq(&self) -> u16 {
        le_u16_at!(self.bytes, 10)
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[SCP_HEADER_LEN..self.len]
    }

    /// Decode a get-status payload.
    pub fn status(&self) -> ReinjectResult<ReinjectionStatus> {
        ReinjectionStatus::from_payload(self.payload())
    }

    /// Copy into `out`, returning the number of bytes written.
    pub fn write_to(&self, out: &mut [u8]) -> ReinjectResult<usize> {
        if out.len() < self.len {
            return Err(ReinjectError::BufferTooSmall {
                needed: self.len,
                got: out.len(),
            });
        }
        out[..self.len].copy_from_slice(self.as_bytes());
        Ok(self.len)
    }
}

impl fmt::Debug for ReplyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyFrame")
            .field("result", &self.result_code())
            .field("seq", &self.seq())
            .field("payload_len", &(self.len - SCP_HEADER_LEN))
            .finish()
    }
}

// -------------------- SCP messages --------------------

/// The part of an SCP message needed to address a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScpEnvelope {
    pub header: SdpHeader,
    pub cmd_rc: u16,
    pub seq: u16,
}

impl ScpEnvelope {
    /// Header-only inspection. Fails for frames without a full SDP header
    /// and for frames not addressed to the SCP port. A `cmd_rc` or `seq`
    /// cut off by the end of the frame reads as zero.
    pub fn peek(bytes: &[u8]) -> ReinjectResult<Self> {
        let header = SdpHeader::decode(bytes)?;
        if header.dest_port() != 0 {
            return Err(ReinjectError::NotScp(header.dest_port()));
        }
        let field = |off: usize| {
            if bytes.len() >= off + 2 {
                le_u16_at!(bytes, off)
            } else {
                0
            }
        };
        Ok(Self {
            header,
            cmd_rc: field(8),
            seq: field(10),
        })
    }
}

/// A complete re-injection control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMessage {
    pub envelope: ScpEnvelope,
    pub arg1: u32,
    pub arg2: u32,
    pub arg3: u32,
}

impl CommandMessage {
    /// Control message for `sub` addressed to (0, 0) core 1.
    pub fn new(sub: SubCommand, arg2: u32) -> Self {
        Self {
            envelope: ScpEnvelope {
                header: SdpHeader::to_core(0, 0, 1),
                cmd_rc: CMD_DPRI,
                seq: 0,
            },
            arg1: sub as u32,
            arg2,
            arg3: 0,
        }
    }

    pub fn set_router_timeout(timeout: RouterTimeout) -> Self {
        Self::new(SubCommand::SetRouterTimeout, timeout.to_field() as u32)
    }

    pub fn set_router_emergency_timeout(timeout: RouterTimeout) -> Self {
        Self::new(SubCommand::SetRouterEmergencyTimeout, timeout.to_field() as u32)
    }

    pub fn set_packet_types(mask: u32) -> Self {
        Self::new(SubCommand::SetPacketTypes, mask & PACKET_TYPE_MASK_ALL)
    }

    pub fn get_status() -> Self {
        Self::new(SubCommand::GetStatus, 0)
    }

    pub fn reset_counters() -> Self {
        Self::new(SubCommand::ResetCounters, 0)
    }

    pub fn exit() -> Self {
        Self::new(SubCommand::Exit, 0)
    }

    pub fn with_header(mut self, header: SdpHeader) -> Self {
        self.envelope.header = header;
        self
    }

    pub fn with_seq(mut self, seq: u16) -> Self {
        self.envelope.seq = seq;
        self
    }

    pub fn with_command(mut self, cmd: u16) -> Self {
        self.envelope.cmd_rc = cmd;
        self
    }

    pub fn decode(bytes: &[u8]) -> ReinjectResult<Self> {
        let envelope = ScpEnvelope::peek(bytes)?;
        if bytes.len() < SCP_MIN_LENGTH {
            return Err(ReinjectError::LengthError {
                expected: SCP_MIN_LENGTH,
                got: bytes.len(),
            });
        }
        Ok(Self {
            envelope,
            arg1: le_u32_at!(bytes, 12),
            arg2: le_u32_at!(bytes, 16),
            arg3: le_u32_at!(bytes, 20),
        })
    }

    pub fn encode(&self) -> CommandFrame {
        let mut bytes = [0u8; MAX_FRAME_LEN];
        self.envelope.header.encode_into(&mut bytes);
        bytes[8..10].copy_from_slice(&self.envelope.cmd_rc.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.envelope.seq.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.arg1.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.arg2.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.arg3.to_le_bytes());
        CommandFrame {
            bytes,
            len: SCP_MIN_LENGTH,
        }
    }
}

// -------------------- status --------------------

/// Decoded get-status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReinjectionStatus {
    pub router_timeout: u32,
    pub router_emergency_timeout: u32,
    pub dropped: u32,
    pub missed_dropped: u32,
    pub queue_overflows: u32,
    pub reinjected: u32,
    /// bit0 = MC, bit1 = PP, bit2 = NN, bit3 = FR.
    pub packet_types: u32,
}

impl ReinjectionStatus {
    pub fn new(timeout: u8, emergency: u8, stats: StatsSnapshot, packet_types: u32) -> Self {
        Self {
            router_timeout: timeout as u32,
            router_emergency_timeout: emergency as u32,
            dropped: stats.dropped,
            missed_dropped: stats.missed_dropped,
            queue_overflows: stats.queue_overflows,
            reinjected: stats.reinjected,
            packet_types,
        }
    }

    pub fn to_words(&self) -> [u32; STATUS_WORDS] {
        [
            self.router_timeout,
            self.router_emergency_timeout,
            self.dropped,
            self.missed_dropped,
            self.queue_overflows,
            self.reinjected,
            self.packet_types,
        ]
    }

    pub fn from_payload(payload: &[u8]) -> ReinjectResult<Self> {
        if payload.len() < STATUS_WORDS * 4 {
            return Err(ReinjectError::LengthError {
                expected: STATUS_WORDS * 4,
                got: payload.len(),
            });
        }
        Ok(Self {
            router_timeout: le_u32_at!(payload, 0),
            router_emergency_timeout: le_u32_at!(payload, 4),
            dropped: le_u32_at!(payload, 8),
            missed_dropped: le_u32_at!(payload, 12),
            queue_overflows: le_u32_at!(payload, 16),
            reinjected: le_u32_at!(payload, 20),
            packet_types: le_u32_at!(payload, 24),
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            dropped: self.dropped,
            missed_dropped: self.missed_dropped,
            queue_overflows: self.queue_overflows,
            reinjected: self.reinjected,
        }
    }

    pub fn timeout(&self) -> RouterTimeout {
        RouterTimeout::from_field(self.router_timeout as u8)
    }

    pub fn emergency_timeout(&self) -> RouterTimeout {
        RouterTimeout::from_field(self.router_emergency_timeout as u8)
    }
}

// -------------------- transport --------------------

/// Message delivery, provided by the platform.
pub trait CommandTransport {
    fn receive_command(&mut self) -> Option<CommandFrame>;
    fn send_reply(&mut self, reply: ReplyFrame);
}

/// Handler verdict for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Ok,
    Status(ReinjectionStatus),
    Error(ReinjectError),
}

impl CommandReply {
    pub fn result_code(&self) -> ResultCode {
        match self {
            CommandReply::Ok | CommandReply::Status(_) => ResultCode::Ok,
            CommandReply::Error(e) => e.to_result_code(),
        }
    }
}

// -------------------- handler --------------------

impl<P: Platform> Engine<P> {
    /// Interpret one control message. Never panics; every failure becomes a
    /// result code and leaves the engine state as it was.
    pub fn handle_command(&self, msg: &CommandMessage) -> CommandReply {
        match self.execute(msg) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(seq = msg.envelope.seq, error = %e, "command rejected");
                CommandReply::Error(e)
            }
        }
    }

    fn execute(&self, msg: &CommandMessage) -> ReinjectResult<CommandReply> {
        if msg.envelope.cmd_rc != CMD_DPRI {
            return Err(ReinjectError::InvalidCommand(msg.envelope.cmd_rc));
        }
        let sub = SubCommand::try_from_u32(msg.arg1)
            .ok_or(ReinjectError::InvalidSubCommand(msg.arg1))?;

        debug!(command = sub.as_str(), seq = msg.envelope.seq, "received command");

        match sub {
            SubCommand::SetRouterTimeout => {
                self.router().set_timeout(TimeoutKind::Primary, msg.arg2)?;
                Ok(CommandReply::Ok)
            }
            SubCommand::SetRouterEmergencyTimeout => {
                self.router().set_timeout(TimeoutKind::Emergency, msg.arg2)?;
                Ok(CommandReply::Ok)
            }
            SubCommand::SetPacketTypes => {
                info!(mask = msg.arg2, "setting packet types");
                self.filter.set_mask(msg.arg2);
                Ok(CommandReply::Ok)
            }
            SubCommand::GetStatus => Ok(CommandReply::Status(self.status())),
            SubCommand::ResetCounters => {
                self.stats.reset();
                Ok(CommandReply::Ok)
            }
            SubCommand::Exit => {
                self.shutdown();
                Ok(CommandReply::Ok)
            }
        }
    }

    /// Current timeouts, statistics and filter mask.
    pub fn status(&self) -> ReinjectionStatus {
        let router = self.router();
        ReinjectionStatus::new(
            router.timeout(TimeoutKind::Primary),
            router.timeout(TimeoutKind::Emergency),
            self.stats.snapshot(),
            self.filter.mask(),
        )
    }

    /// Handle one raw frame and build its reply.
    ///
    /// Returns `None` when no reply can or should be sent: the frame is
    /// shorter than an SDP header, it is not for the SCP port, or the engine
    /// has already exited. Anything else short of a full message gets a
    /// length error.
    pub fn handle_frame(&self, bytes: &[u8]) -> Option<ReplyFrame> {
        if !self.is_running() {
            debug!("engine stopped, dropping command");
            return None;
        }

        let envelope = match ScpEnvelope::peek(bytes) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "discarding frame");
                return None;
            }
        };

        let reply = match CommandMessage::decode(bytes) {
            Ok(msg) => self.handle_command(&msg),
            Err(e) => {
                warn!(seq = envelope.seq, error = %e, "malformed command");
                CommandReply::Error(e)
            }
        };

        let frame = match reply {
            CommandReply::Status(status) => {
                ReplyFrame::build(&envelope, ResultCode::Ok, &status.to_words())
            }
            other => ReplyFrame::build(&envelope, other.result_code(), &[]),
        };
        Some(frame)
    }

    /// Service every pending command, stopping once exit has been answered.
    /// Returns the number of frames consumed.
    pub fn poll_commands<T: CommandTransport + ?Sized>(&self, transport: &mut T) -> usize {
        let mut handled = 0;
        while self.is_running() {
            let Some(frame) = transport.receive_command() else {
                break;
            };
            handled += 1;
            if let Some(reply) = self.handle_frame(frame.as_bytes()) {
                transport.send_reply(reply);
            }
        }
        handled
    }
}
