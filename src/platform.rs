//! Hardware boundary.
//!
//! The engine talks to the router, the comms controller (the node's
//! outbound transmitter), timer 1 and the vectored interrupt controller
//! purely through word-sized register reads and writes. [`Platform`] is that
//! seam: [`crate::mmio::MmioPlatform`] backs it with real registers,
//! [`crate::sim::SimPlatform`] with a simulated register file.

use crate::config::{CC_SLOT, CC_TNF_INT, CPU_INT, CPU_SLOT, RTR_DUMP_INT, TIMER1_INT, TIMER_SLOT};

/// Router register word offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum RouterReg {
    Control = 0,
    /// Reading clears pending router interrupts.
    Status = 1,
    DumpHeader = 6,
    DumpKey = 7,
    DumpData = 8,
    /// Reading clears the dump condition and the dump interrupt.
    DumpStatus = 10,
}

/// Comms controller register word offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CommsReg {
    TxControl = 0,
    TxData = 1,
    /// Writing the key fires the packet.
    TxKey = 2,
    SourceAddress = 6,
}

/// Timer 1 register word offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TimerReg {
    Load = 0,
    Control = 2,
    IntClear = 3,
    BackgroundLoad = 6,
}

/// VIC register word offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum VicReg {
    Select = 3,
    Enable = 4,
    Disable = 5,
    VectorAddress = 12,
}

/// Interrupt priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// The single fast interrupt; preempts everything else.
    Fast,
    /// Vectored interrupt in the given VIC slot.
    Standard { slot: u32 },
}

/// Interrupt sources the engine installs handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptSource {
    /// Router dumped a packet.
    DroppedPacket,
    /// Periodic timer 1 tick.
    TimerTick,
    /// Comms controller transmit buffer not full.
    TransmitterReady,
    /// Inbound message from the monitor processor.
    Command,
}

impl InterruptSource {
    pub const fn interrupt_number(self) -> u32 {
        match self {
            InterruptSource::DroppedPacket => RTR_DUMP_INT,
            InterruptSource::TimerTick => TIMER1_INT,
            InterruptSource::TransmitterReady => CC_TNF_INT,
            InterruptSource::Command => CPU_INT,
        }
    }

    #[inline]
    pub const fn mask(self) -> u32 {
        1 << self.interrupt_number()
    }

    pub const fn priority(self) -> Priority {
        match self {
            InterruptSource::DroppedPacket => Priority::Fast,
            InterruptSource::TimerTick => Priority::Standard { slot: TIMER_SLOT },
            InterruptSource::TransmitterReady => Priority::Standard { slot: CC_SLOT },
            InterruptSource::Command => Priority::Standard { slot: CPU_SLOT },
        }
    }
}

/// Register-level access to the node hardware.
///
/// All methods take `&self`: they are called from interrupt context and
/// model memory-mapped I/O, where a write through a shared pointer is the norm.
pub trait Platform {
    fn router_read(&self, reg: RouterReg) -> u32;
    fn router_write(&self, reg: RouterReg, value: u32);

    fn comms_read(&self, reg: CommsReg) -> u32;
    fn comms_write(&self, reg: CommsReg, value: u32);

    fn timer_write(&self, reg: TimerReg, value: u32);

    fn vic_write(&self, reg: VicReg, value: u32);

    /// Mask the fast interrupt, returning the state to restore.
    fn fiq_disable(&self) -> u32;

    /// Restore the state returned by [`Platform::fiq_disable`].
    fn interrupts_restore(&self, saved: u32);

    /// CPU clock in MHz (timer ticks per microsecond).
    fn cpu_clock_mhz(&self) -> u32;

    /// Route `source` to the engine handler at its [`Priority`].
    fn bind_interrupt(&self, source: InterruptSource);

    /// Park until any interrupt has been serviced.
    fn wait_for_interrupt(&self);
}

/// Scoped fast-interrupt mask.
///
/// The fast interrupt stays masked for as long as the guard lives and is
/// restored on every exit path. Hold it only around the queue's head/tail
/// check-and-update, never across a transmitter register write.
pub struct FiqGuard<'a, P: Platform + ?Sized> {
    platform: &'a P,
    saved: u32,
}

impl<'a, P: Platform + ?Sized> FiqGuard<'a, P> {
    #[inline]
    pub fn new(platform: &'a P) -> Self {
        let saved = platform.fiq_disable();
        Self { platform, saved }
    }
}

impl<P: Platform + ?Sized> Drop for FiqGuard<'_, P> {
    #[inline]
    fn drop(&mut self) {
        self.platform.interrupts_restore(self.saved);
    }
}

/// Value written to the VIC vector address register to end an interrupt.
pub const VIC_ACK: u32 = 0;

#[inline]
pub fn acknowledge_interrupt<P: Platform + ?Sized>(platform: &P) {
    platform.vic_write(VicReg::VectorAddress, VIC_ACK);
}
