//! Dumped packet value type and header accessors.

use crate::config::{
    PacketType, PKT_CONTROL_MASK, PKT_PLD_MASK, PKT_ROUTE_MASK,
};
use core::fmt;

/// A packet captured from the router's dump registers.
///
/// Copied by value into and out of the queue; never mutated once captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DumpedPacket {
    pub header: u32,
    pub key: u32,
    /// Only meaningful when the header's payload flag is set.
    pub payload: u32,
}

impl DumpedPacket {
    pub const EMPTY: DumpedPacket = DumpedPacket {
        header: 0,
        key: 0,
        payload: 0,
    };

    #[inline]
    pub const fn new(header: u32, key: u32, payload: u32) -> Self {
        Self {
            header,
            key,
            payload,
        }
    }

    #[inline]
    pub fn packet_type(&self) -> PacketType {
        PacketType::from_header(self.header)
    }

    #[inline]
    pub const fn has_payload(&self) -> bool {
        self.header & PKT_PLD_MASK != 0
    }

    /// Value for the transmitter control register.
    #[inline]
    pub const fn control_bits(&self) -> u32 {
        self.header & PKT_CONTROL_MASK
    }

    /// Route bits, OR-ed into the transmitter SAR register.
    #[inline]
    pub const fn route_bits(&self) -> u32 {
        self.header & PKT_ROUTE_MASK
    }
}

impl fmt::Display for DumpedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {}, Header: 0x{:08x}, Key: 0x{:08x}",
            self.packet_type().as_str(),
            self.header,
            self.key
        )?;
        if self.has_payload() {
            write!(f, ", Payload: 0x{:08x}", self.payload)?;
        }
        Ok(())
    }
}
