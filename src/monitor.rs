//! Router state monitor: blocked flag and the two wait (timeout) fields.

use crate::config::{
    MAX_ROUTER_TIMEOUT, RTR_BLOCKED_MASK, RTR_DENABLE_MASK, RTR_WAIT1_MASK, RTR_WAIT1_SHIFT,
    RTR_WAIT2_MASK, RTR_WAIT2_SHIFT,
};
use crate::platform::{Platform, RouterReg};
use crate::{ReinjectError, ReinjectResult};

/// Which of the two router wait fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// wait1: cycles before the router tries emergency routing.
    Primary,
    /// wait2: cycles spent emergency routing before the packet is dumped.
    Emergency,
}

impl TimeoutKind {
    #[inline]
    const fn shift(self) -> u32 {
        match self {
            TimeoutKind::Primary => RTR_WAIT1_SHIFT,
            TimeoutKind::Emergency => RTR_WAIT2_SHIFT,
        }
    }

    #[inline]
    const fn mask(self) -> u32 {
        match self {
            TimeoutKind::Primary => RTR_WAIT1_MASK,
            TimeoutKind::Emergency => RTR_WAIT2_MASK,
        }
    }
}

/// An 8-bit router wait field split into its 4-bit mantissa and exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouterTimeout {
    pub mantissa: u8,
    pub exponent: u8,
}

impl RouterTimeout {
    pub fn new(mantissa: u8, exponent: u8) -> ReinjectResult<Self> {
        if mantissa > 0xf {
            return Err(ReinjectError::ArgumentOutOfRange {
                value: mantissa as u32,
                max: 0xf,
            });
        }
        if exponent > 0xf {
            return Err(ReinjectError::ArgumentOutOfRange {
                value: exponent as u32,
                max: 0xf,
            });
        }
        Ok(Self { mantissa, exponent })
    }

    #[inline]
    pub const fn from_field(field: u8) -> Self {
        Self {
            mantissa: field & 0xf,
            exponent: field >> 4,
        }
    }

    #[inline]
    pub const fn to_field(self) -> u8 {
        (self.mantissa & 0xf) | ((self.exponent & 0xf) << 4)
    }
}

/// Borrowing view over the router registers.
pub struct RouterMonitor<'a, P: Platform + ?Sized> {
    platform: &'a P,
}

impl<'a, P: Platform + ?Sized> RouterMonitor<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    /// True while the router cannot accept injected packets.
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.platform.router_read(RouterReg::Status) & RTR_BLOCKED_MASK != 0
    }

    pub fn timeout(&self, kind: TimeoutKind) -> u8 {
        let control = self.platform.router_read(RouterReg::Control);
        ((control & kind.mask()) >> kind.shift()) as u8
    }

    /// Read-modify-write one wait field, preserving every other control bit.
    pub fn set_timeout(&self, kind: TimeoutKind, value: u32) -> ReinjectResult<()> {
        if value > MAX_ROUTER_TIMEOUT {
            return Err(ReinjectError::ArgumentOutOfRange {
                value,
                max: MAX_ROUTER_TIMEOUT,
            });
        }
        let control = self.platform.router_read(RouterReg::Control);
        let updated = (control & !kind.mask()) | ((value & MAX_ROUTER_TIMEOUT) << kind.shift());
        self.platform.router_write(RouterReg::Control, updated);
        Ok(())
    }

    /// Startup sequence: write both wait fields (keeping the low 16 bits),
    /// clear pending router interrupts and dump state, then enable dump
    /// interrupts.
    pub fn configure(&self, primary: u8, emergency: u8) {
        let control = self.platform.router_read(RouterReg::Control);
        let waits = ((primary as u32) << RTR_WAIT1_SHIFT) | ((emergency as u32) << RTR_WAIT2_SHIFT);
        self.platform
            .router_write(RouterReg::Control, (control & 0x0000_ffff) | waits);

        let _ = self.platform.router_read(RouterReg::Status);
        let _ = self.platform.router_read(RouterReg::DumpStatus);

        let control = self.platform.router_read(RouterReg::Control);
        self.platform
            .router_write(RouterReg::Control, control | RTR_DENABLE_MASK);
    }
}
