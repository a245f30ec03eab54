//! Engine configuration and wire/register constants.
//!
//! This module defines:
//! - Build-time tunables resolved by `define_env_constant!`.
//! - The router, packet-header and interrupt bit layouts. These must stay
//!   bit-exact with the router hardware.
//! - The `PacketType` and `SubCommand` enums shared with the C header.
//! - [`EngineConfig`], the runtime defaults applied by `Engine::start`.

use crate::macros::ReprU32Enum;
use crate::{impl_repr_u32_enum, try_enum_from_u32};
use core::mem::size_of;
use reinjector_macros::define_env_constant;
use strum_macros::{EnumCount, EnumIter};

// -----------------------------------------------------------------------------
// Build-time tunables
// -----------------------------------------------------------------------------

define_env_constant!(PKT_QUEUE_SIZE: usize, env = "REINJECTOR_PKT_QUEUE_SIZE", default = 256, min = 2);

define_env_constant!(TICK_PERIOD_US: u32, env = "REINJECTOR_TICK_PERIOD_US", default = 10, min = 1);

/// Initial router control value for the two wait fields
/// (wait1 = 0x4f, wait2 = 0x00). The low 16 bits are never touched.
pub const ROUTER_INITIAL_TIMEOUT: u32 = 0x004f_0000;

// -----------------------------------------------------------------------------
// Router status / control register bits
// -----------------------------------------------------------------------------

pub const RTR_BLOCKED_BIT: u32 = 25;
pub const RTR_DOVRFLW_BIT: u32 = 30;
pub const RTR_DENABLE_BIT: u32 = 2;

/// Router blocked.
pub const RTR_BLOCKED_MASK: u32 = 1 << RTR_BLOCKED_BIT;
/// Router dump overflow.
pub const RTR_DOVRFLW_MASK: u32 = 1 << RTR_DOVRFLW_BIT;
/// Enable dump interrupts.
pub const RTR_DENABLE_MASK: u32 = 1 << RTR_DENABLE_BIT;

pub const RTR_WAIT1_SHIFT: u32 = 16;
pub const RTR_WAIT2_SHIFT: u32 = 24;
pub const RTR_WAIT1_MASK: u32 = 0xff << RTR_WAIT1_SHIFT;
pub const RTR_WAIT2_MASK: u32 = 0xff << RTR_WAIT2_SHIFT;

/// Largest value either 8-bit wait field can hold.
pub const MAX_ROUTER_TIMEOUT: u32 = 0xff;

// -----------------------------------------------------------------------------
// Packet header layout
// -----------------------------------------------------------------------------

pub const PKT_CONTROL_SHFT: u32 = 16;
pub const PKT_PLD_SHFT: u32 = 17;
pub const PKT_TYPE_SHFT: u32 = 22;
pub const PKT_ROUTE_SHFT: u32 = 24;

pub const PKT_CONTROL_MASK: u32 = 0xff << PKT_CONTROL_SHFT;
pub const PKT_PLD_MASK: u32 = 1 << PKT_PLD_SHFT;
pub const PKT_TYPE_MASK: u32 = 3 << PKT_TYPE_SHFT;
pub const PKT_ROUTE_MASK: u32 = 7 << PKT_ROUTE_SHFT;

/// Bits of the comms-controller SAR register kept when re-injecting
/// (the point-to-point source id).
pub const CC_SAR_SOURCE_MASK: u32 = 0x0000_ffff;

// -----------------------------------------------------------------------------
// Interrupt controller
// -----------------------------------------------------------------------------

pub const TIMER1_INT: u32 = 4;
pub const CC_TNF_INT: u32 = 12;
pub const RTR_DUMP_INT: u32 = 17;
pub const CPU_INT: u32 = 19;

/// VIC vector slots used by the standard-priority handlers.
pub const CPU_SLOT: u32 = 0;
pub const CC_SLOT: u32 = 1;
pub const TIMER_SLOT: u32 = 2;

/// Timer 1 control word: enabled, periodic, interrupt enabled, 32-bit.
pub const TIMER_CONTROL_START: u32 = 0xe2;

// -----------------------------------------------------------------------------
// Command protocol
// -----------------------------------------------------------------------------

/// SCP command code for dropped packet re-injection control.
pub const CMD_DPRI: u16 = 30;

/// Minimum length (from the SDP flags byte) of a command message.
pub const SCP_MIN_LENGTH: usize = 24;

/// Number of 32-bit words in a get-status reply.
pub const STATUS_WORDS: usize = 7;

/// Dropped packet re-injection internal control commands (arg1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
#[repr(u32)]
pub enum SubCommand {
    SetRouterTimeout = 0,
    SetRouterEmergencyTimeout = 1,
    SetPacketTypes = 2,
    GetStatus = 3,
    ResetCounters = 4,
    Exit = 5,
}

impl_repr_u32_enum!(SubCommand, SubCommand::MAX);

impl SubCommand {
    pub const MAX: u32 = SubCommand::Exit as u32;

    pub fn try_from_u32(x: u32) -> Option<Self> {
        try_enum_from_u32(x)
    }

    /// Stable name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SubCommand::SetRouterTimeout => "SET_ROUTER_TIMEOUT",
            SubCommand::SetRouterEmergencyTimeout => "SET_ROUTER_EMERGENCY_TIMEOUT",
            SubCommand::SetPacketTypes => "SET_PACKET_TYPES",
            SubCommand::GetStatus => "GET_STATUS",
            SubCommand::ResetCounters => "RESET_COUNTERS",
            SubCommand::Exit => "EXIT",
        }
    }
}

/// Packet classes, numbered by their value in the header type field.
///
/// The mask bit for a class (as used by set-packet-types and get-status) is
/// `1 << class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, EnumCount, EnumIter)]
#[repr(u32)]
pub enum PacketType {
    /// Multicast.
    Multicast = 0,
    PointToPoint = 1,
    NearestNeighbour = 2,
    FixedRoute = 3,
}

impl_repr_u32_enum!(PacketType, PacketType::MAX);

impl PacketType {
    pub const MAX: u32 = PacketType::FixedRoute as u32;

    pub fn try_from_u32(x: u32) -> Option<Self> {
        try_enum_from_u32(x)
    }

    /// Classify a packet header by its type bits.
    #[inline]
    pub fn from_header(hdr: u32) -> Self {
        match (hdr & PKT_TYPE_MASK) >> PKT_TYPE_SHFT {
            0 => PacketType::Multicast,
            1 => PacketType::PointToPoint,
            2 => PacketType::NearestNeighbour,
            _ => PacketType::FixedRoute,
        }
    }

    /// Flag bit for this class in a packet-type mask.
    #[inline]
    pub const fn mask_bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PacketType::Multicast => "MC",
            PacketType::PointToPoint => "PP",
            PacketType::NearestNeighbour => "NN",
            PacketType::FixedRoute => "FR",
        }
    }
}

/// All four packet-type mask bits.
pub const PACKET_TYPE_MASK_ALL: u32 = 0xf;

// -----------------------------------------------------------------------------
// Runtime defaults
// -----------------------------------------------------------------------------

/// Values applied to the hardware and engine state by `Engine::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Router wait1 field written at startup.
    pub initial_timeout: u8,
    /// Router wait2 field written at startup.
    pub initial_emergency_timeout: u8,
    /// Packet classes re-injected until told otherwise.
    pub initial_packet_types: u32,
    /// Timer tick period in microseconds.
    pub tick_period_us: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_timeout: ((ROUTER_INITIAL_TIMEOUT & RTR_WAIT1_MASK) >> RTR_WAIT1_SHIFT) as u8,
            initial_emergency_timeout: ((ROUTER_INITIAL_TIMEOUT & RTR_WAIT2_MASK)
                >> RTR_WAIT2_SHIFT) as u8,
            initial_packet_types: PacketType::Multicast.mask_bit(),
            tick_period_us: TICK_PERIOD_US,
        }
    }
}
