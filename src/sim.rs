//! Host-side simulated node.
//!
//! [`SimPlatform`] stands in for the router, comms controller, timer and VIC
//! with a register file behind a mutex. It behaves like the hardware where
//! the engine can observe it:
//! - the router holds at most one dumped packet; a second dump while one is
//!   pending is lost and raises the overflow bit,
//! - reading the dump status register releases the pending dump,
//! - writing the transmit key fires a packet into the transmit log.
//!
//! [`SimTransport`] is an in-memory command mailbox.

use crate::command::{CommandFrame, CommandMessage, CommandTransport, ReplyFrame};
use crate::config::{PKT_ROUTE_MASK, RTR_BLOCKED_MASK, RTR_DOVRFLW_MASK};
use crate::engine::{Engine, HandlerOutcome};
use crate::lock::EngineMutex;
use crate::packet::DumpedPacket;
use crate::platform::{
    CommsReg, InterruptSource, Platform, Priority, RouterReg, TimerReg, VicReg,
};
use std::collections::VecDeque;
use std::vec::Vec;

/// Default simulated CPU clock.
pub const SIM_CPU_CLOCK_MHZ: u32 = 200;

/// One packet written to the simulated transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmittedPacket {
    pub control: u32,
    pub source_address: u32,
    pub payload: Option<u32>,
    pub key: u32,
}

impl TransmittedPacket {
    /// The packet as the router would have dumped it (control and route
    /// bits of the header only).
    pub fn as_dumped(&self) -> DumpedPacket {
        DumpedPacket::new(
            self.control | (self.source_address & PKT_ROUTE_MASK),
            self.key,
            self.payload.unwrap_or(0),
        )
    }
}

#[derive(Debug, Default)]
struct SimState {
    router_control: u32,
    router_status: u32,
    dump: Option<DumpedPacket>,
    dump_overflow: bool,
    lost_dumps: u32,

    tx_control: u32,
    tx_data: Option<u32>,
    source_address: u32,
    transmitted: Vec<TransmittedPacket>,

    timer: [u32; 8],

    vic_enabled: u32,
    vic_select: u32,
    vic_acks: u32,
    bindings: Vec<(InterruptSource, Priority)>,

    fiq_masked: bool,
    fiq_sections: u32,
    idle_waits: u32,
}

#[derive(Debug)]
pub struct SimPlatform {
    state: EngineMutex<SimState>,
    cpu_clock_mhz: u32,
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            state: EngineMutex::new(SimState::default()),
            cpu_clock_mhz: SIM_CPU_CLOCK_MHZ,
        }
    }

    /// Preload the comms controller source address register.
    pub fn with_source_address(self, sar: u32) -> Self {
        self.state.lock().source_address = sar;
        self
    }

    /// Preload the router control register.
    pub fn with_router_control(self, control: u32) -> Self {
        self.state.lock().router_control = control;
        self
    }

    pub fn with_cpu_clock_mhz(mut self, mhz: u32) -> Self {
        self.cpu_clock_mhz = mhz;
        self
    }

    pub fn set_blocked(&self, blocked: bool) {
        let mut st = self.state.lock();
        if blocked {
            st.router_status |= RTR_BLOCKED_MASK;
        } else {
            st.router_status &= !RTR_BLOCKED_MASK;
        }
    }

    /// Router dumps a packet. Returns `false` if one was already pending,
    /// in which case the new packet is lost and the overflow bit is raised.
    pub fn inject_dump(&self, pkt: DumpedPacket) -> bool {
        let mut st = self.state.lock();
        if st.dump.is_some() {
            st.dump_overflow = true;
            st.lost_dumps += 1;
            return false;
        }
        st.dump = Some(pkt);
        true
    }

    pub fn dump_pending(&self) -> bool {
        self.state.lock().dump.is_some()
    }

    /// Dumps the router lost because one was already pending.
    pub fn lost_dumps(&self) -> u32 {
        self.state.lock().lost_dumps
    }

    pub fn interrupt_enabled(&self, source: InterruptSource) -> bool {
        self.state.lock().vic_enabled & source.mask() != 0
    }

    pub fn tx_ready_enabled(&self) -> bool {
        self.interrupt_enabled(InterruptSource::TransmitterReady)
    }

    pub fn transmitted(&self) -> Vec<TransmittedPacket> {
        self.state.lock().transmitted.clone()
    }

    pub fn take_transmitted(&self) -> Vec<TransmittedPacket> {
        std::mem::take(&mut self.state.lock().transmitted)
    }

    pub fn router_control(&self) -> u32 {
        self.state.lock().router_control
    }

    pub fn source_address(&self) -> u32 {
        self.state.lock().source_address
    }

    pub fn timer_reg(&self, reg: TimerReg) -> u32 {
        self.state.lock().timer[reg as usize]
    }

    pub fn vic_enabled(&self) -> u32 {
        self.state.lock().vic_enabled
    }

    pub fn vic_select(&self) -> u32 {
        self.state.lock().vic_select
    }

    /// Number of end-of-interrupt writes seen.
    pub fn vic_acks(&self) -> u32 {
        self.state.lock().vic_acks
    }

    pub fn bindings(&self) -> Vec<(InterruptSource, Priority)> {
        self.state.lock().bindings.clone()
    }

    pub fn fiq_masked(&self) -> bool {
        self.state.lock().fiq_masked
    }

    /// Number of fast-interrupt critical sections entered.
    pub fn fiq_sections(&self) -> u32 {
        self.state.lock().fiq_sections
    }

    pub fn idle_waits(&self) -> u32 {
        self.state.lock().idle_waits
    }
}

impl Platform for SimPlatform {
    fn router_read(&self, reg: RouterReg) -> u32 {
        let mut st = self.state.lock();
        match reg {
            RouterReg::Control => st.router_control,
            RouterReg::Status => st.router_status,
            RouterReg::DumpHeader => st.dump.map_or(0, |p| p.header),
            RouterReg::DumpKey => st.dump.map_or(0, |p| p.key),
            RouterReg::DumpData => st.dump.map_or(0, |p| p.payload),
            RouterReg::DumpStatus => {
                let overflow = std::mem::take(&mut st.dump_overflow);
                st.dump = None;
                if overflow { RTR_DOVRFLW_MASK } else { 0 }
            }
        }
    }

    fn router_write(&self, reg: RouterReg, value: u32) {
        let mut st = self.state.lock();
        if reg == RouterReg::Control {
            st.router_control = value;
        }
    }

    fn comms_read(&self, reg: CommsReg) -> u32 {
        let st = self.state.lock();
        match reg {
            CommsReg::TxControl => st.tx_control,
            CommsReg::TxData => st.tx_data.unwrap_or(0),
            CommsReg::TxKey => 0,
            CommsReg::SourceAddress => st.source_address,
        }
    }

    fn comms_write(&self, reg: CommsReg, value: u32) {
        let mut st = self.state.lock();
        match reg {
            CommsReg::TxControl => st.tx_control = value,
            CommsReg::TxData => st.tx_data = Some(value),
            CommsReg::SourceAddress => st.source_address = value,
            CommsReg::TxKey => {
                let sent = TransmittedPacket {
                    control: st.tx_control,
                    source_address: st.source_address,
                    payload: st.tx_data.take(),
                    key: value,
                };
                st.transmitted.push(sent);
            }
        }
    }

    fn timer_write(&self, reg: TimerReg, value: u32) {
        self.state.lock().timer[reg as usize] = value;
    }

    fn vic_write(&self, reg: VicReg, value: u32) {
        let mut st = self.state.lock();
        match reg {
            VicReg::Select => st.vic_select = value,
            VicReg::Enable => st.vic_enabled |= value,
            VicReg::Disable => st.vic_enabled &= !value,
            VicReg::VectorAddress => st.vic_acks += 1,
        }
    }

    fn fiq_disable(&self) -> u32 {
        let mut st = self.state.lock();
        let was = st.fiq_masked;
        st.fiq_masked = true;
        st.fiq_sections += 1;
        was as u32
    }

    fn interrupts_restore(&self, saved: u32) {
        self.state.lock().fiq_masked = saved != 0;
    }

    fn cpu_clock_mhz(&self) -> u32 {
        self.cpu_clock_mhz
    }

    fn bind_interrupt(&self, source: InterruptSource) {
        let mut st = self.state.lock();
        let priority = source.priority();
        if priority == Priority::Fast {
            st.vic_select |= source.mask();
        }
        st.bindings.push((source, priority));
    }

    fn wait_for_interrupt(&self) {
        self.state.lock().idle_waits += 1;
        std::thread::yield_now();
    }
}

impl Engine<SimPlatform> {
    /// Deliver whatever interrupts the simulated hardware has raised: a
    /// pending dump first (fast interrupt), then transmitter-ready for as
    /// long as it stays enabled. The simulated transmitter is always ready.
    pub fn service_pending(&self) -> Vec<HandlerOutcome> {
        let mut outcomes = Vec::new();
        let sim = self.platform();

        if sim.dump_pending() && sim.interrupt_enabled(InterruptSource::DroppedPacket) {
            outcomes.push(self.dispatch(InterruptSource::DroppedPacket));
        }

        // Each call either sends a packet or disables the interrupt.
        let mut budget = self.queue().len() + 1;
        while budget > 0 && sim.tx_ready_enabled() {
            outcomes.push(self.dispatch(InterruptSource::TransmitterReady));
            budget -= 1;
        }
        outcomes
    }

    /// One timer tick followed by everything it unblocks.
    pub fn tick(&self) -> Vec<HandlerOutcome> {
        let mut outcomes = vec![self.dispatch(InterruptSource::TimerTick)];
        outcomes.extend(self.service_pending());
        outcomes
    }
}

/// In-memory command mailbox.
#[derive(Debug, Default)]
pub struct SimTransport {
    inbox: VecDeque<CommandFrame>,
    outbox: Vec<ReplyFrame>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: CommandFrame) {
        self.inbox.push_back(frame);
    }

    pub fn push(&mut self, msg: CommandMessage) {
        self.push_frame(msg.encode());
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn replies(&self) -> &[ReplyFrame] {
        &self.outbox
    }

    pub fn take_replies(&mut self) -> Vec<ReplyFrame> {
        std::mem::take(&mut self.outbox)
    }
}

impl CommandTransport for SimTransport {
    fn receive_command(&mut self) -> Option<CommandFrame> {
        self.inbox.pop_front()
    }

    fn send_reply(&mut self, reply: ReplyFrame) {
        self.outbox.push(reply);
    }
}
