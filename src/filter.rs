//! Per-class re-injection filter.
//!
//! Written only by the command handler, read by the capture handler on every
//! dump. Each flag is a single aligned word, so a reader never sees a torn value.

use crate::config::{PacketType, PACKET_TYPE_MASK_ALL};
use core::sync::atomic::{AtomicBool, Ordering};
use strum::{EnumCount, IntoEnumIterator};

#[derive(Debug)]
pub struct FilterState {
    enabled: [AtomicBool; PacketType::COUNT],
}

impl FilterState {
    /// Filter from a packet-type mask (bit0 = MC, bit1 = PP, bit2 = NN, bit3 = FR).
    pub fn from_mask(mask: u32) -> Self {
        let f = Self {
            enabled: [const { AtomicBool::new(false) }; PacketType::COUNT],
        };
        f.set_mask(mask);
        f
    }

    #[inline]
    pub fn is_enabled(&self, ty: PacketType) -> bool {
        self.enabled[ty as usize].load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, ty: PacketType, on: bool) {
        self.enabled[ty as usize].store(on, Ordering::Relaxed);
    }

    /// Overwrite all four flags. Bits above bit 3 are ignored.
    pub fn set_mask(&self, mask: u32) {
        for ty in PacketType::iter() {
            self.set_enabled(ty, mask & ty.mask_bit() != 0);
        }
    }

    pub fn mask(&self) -> u32 {
        PacketType::iter()
            .filter(|ty| self.is_enabled(*ty))
            .fold(0, |acc, ty| acc | ty.mask_bit())
            & PACKET_TYPE_MASK_ALL
    }
}

impl Default for FilterState {
    /// Multicast only.
    fn default() -> Self {
        Self::from_mask(PacketType::Multicast.mask_bit())
    }
}
