//! Memory-mapped register backend.
//!
//! Register blocks are reached through base pointers supplied by the C
//! start-up code, together with the few operations that need processor
//! instructions (masking the fast interrupt, waiting for an interrupt) and
//! the addresses of the assembly/C interrupt entry shims that call back into
//! `reinjector_fiq_dropped_packet` and friends.

use crate::platform::{
    CommsReg, InterruptSource, Platform, Priority, RouterReg, TimerReg, VicReg,
};
use core::ptr;

/// Word offset of the first VIC vector address register.
pub const VIC_VECTOR_ADDR_BASE: usize = 0x100 / 4;
/// Word offset of the first VIC vector control register.
pub const VIC_VECTOR_CTRL_BASE: usize = 0x200 / 4;
/// Vector control enable bit, OR-ed with the interrupt number.
pub const VIC_VECTOR_ENABLE: u32 = 0x20;

pub type CFiqDisable = Option<unsafe extern "C" fn() -> u32>;
pub type CInterruptsRestore = Option<unsafe extern "C" fn(saved: u32)>;
pub type CWaitForInterrupt = Option<unsafe extern "C" fn()>;
pub type CIsr = Option<unsafe extern "C" fn()>;

/// Hardware description handed over by the C side. Must match the C header layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReinjectorHardware {
    pub router_base: *mut u32,
    pub comms_base: *mut u32,
    pub timer_base: *mut u32,
    pub vic_base: *mut u32,
    /// Where the fast interrupt handler address lives. May be null when the
    /// fast vector is fixed at link time.
    pub fiq_vector: *mut u32,
    pub cpu_clock_mhz: u32,
    /// VIC slot holding the runtime's own SDP handler, cleared before the
    /// command handler is installed. Negative when there is none.
    pub sark_slot: i32,
    pub fiq_disable: CFiqDisable,
    pub interrupts_restore: CInterruptsRestore,
    pub wait_for_interrupt: CWaitForInterrupt,
    pub isr_dropped_packet: CIsr,
    pub isr_timer_tick: CIsr,
    pub isr_transmitter_ready: CIsr,
    pub isr_command: CIsr,
}

#[derive(Debug)]
pub struct MmioPlatform {
    hw: ReinjectorHardware,
    fiq_disable: unsafe extern "C" fn() -> u32,
    interrupts_restore: unsafe extern "C" fn(u32),
    wait_for_interrupt: unsafe extern "C" fn(),
}

// SAFETY: the register pointers refer to device memory that is valid for the
// whole program; every access is a single volatile word access.
unsafe impl Send for MmioPlatform {}
unsafe impl Sync for MmioPlatform {}

impl MmioPlatform {
    /// Returns `None` if a register base or a required callback is missing.
    ///
    /// # Safety
    ///
    /// Every non-null pointer in `hw` must address its register block (or a
    /// fake register array at least as large) for the rest of the program,
    /// and the callbacks must be safe to call from interrupt context.
    pub unsafe fn new(hw: ReinjectorHardware) -> Option<Self> {
        if hw.router_base.is_null()
            || hw.comms_base.is_null()
            || hw.timer_base.is_null()
            || hw.vic_base.is_null()
        {
            return None;
        }
        Some(Self {
            fiq_disable: hw.fiq_disable?,
            interrupts_restore: hw.interrupts_restore?,
            wait_for_interrupt: hw.wait_for_interrupt?,
            hw,
        })
    }

    #[inline]
    fn read(base: *mut u32, offset: usize) -> u32 {
        // SAFETY: guaranteed by the contract of `MmioPlatform::new`.
        unsafe { ptr::read_volatile(base.add(offset)) }
    }

    #[inline]
    fn write(base: *mut u32, offset: usize, value: u32) {
        // SAFETY: guaranteed by the contract of `MmioPlatform::new`.
        unsafe { ptr::write_volatile(base.add(offset), value) }
    }

    fn isr_address(&self, source: InterruptSource) -> u32 {
        let isr = match source {
            InterruptSource::DroppedPacket => self.hw.isr_dropped_packet,
            InterruptSource::TimerTick => self.hw.isr_timer_tick,
            InterruptSource::TransmitterReady => self.hw.isr_transmitter_ready,
            InterruptSource::Command => self.hw.isr_command,
        };
        isr.map_or(0, |f| f as usize as u32)
    }
}

impl Platform for MmioPlatform {
    fn router_read(&self, reg: RouterReg) -> u32 {
        Self::read(self.hw.router_base, reg as usize)
    }

    fn router_write(&self, reg: RouterReg, value: u32) {
        Self::write(self.hw.router_base, reg as usize, value)
    }

    fn comms_read(&self, reg: CommsReg) -> u32 {
        Self::read(self.hw.comms_base, reg as usize)
    }

    fn comms_write(&self, reg: CommsReg, value: u32) {
        Self::write(self.hw.comms_base, reg as usize, value)
    }

    fn timer_write(&self, reg: TimerReg, value: u32) {
        Self::write(self.hw.timer_base, reg as usize, value)
    }

    fn vic_write(&self, reg: VicReg, value: u32) {
        Self::write(self.hw.vic_base, reg as usize, value)
    }

    fn fiq_disable(&self) -> u32 {
        // SAFETY: callback validated in `new`.
        unsafe { (self.fiq_disable)() }
    }

    fn interrupts_restore(&self, saved: u32) {
        // SAFETY: callback validated in `new`.
        unsafe { (self.interrupts_restore)(saved) }
    }

    fn cpu_clock_mhz(&self) -> u32 {
        self.hw.cpu_clock_mhz
    }

    fn bind_interrupt(&self, source: InterruptSource) {
        let vic = self.hw.vic_base;
        let select = Self::read(vic, VicReg::Select as usize);
        let isr = self.isr_address(source);

        match source.priority() {
            Priority::Fast => {
                if !self.hw.fiq_vector.is_null() {
                    // SAFETY: guaranteed by the contract of `MmioPlatform::new`.
                    unsafe { ptr::write_volatile(self.hw.fiq_vector, isr) };
                }
                Self::write(vic, VicReg::Select as usize, select | source.mask());
            }
            Priority::Standard { slot } => {
                if source == InterruptSource::Command {
                    if let Ok(sark) = usize::try_from(self.hw.sark_slot) {
                        Self::write(vic, VIC_VECTOR_CTRL_BASE + sark, 0);
                    }
                }
                let slot = slot as usize;
                Self::write(vic, VIC_VECTOR_ADDR_BASE + slot, isr);
                Self::write(
                    vic,
                    VIC_VECTOR_CTRL_BASE + slot,
                    VIC_VECTOR_ENABLE | source.interrupt_number(),
                );
                Self::write(vic, VicReg::Select as usize, select & !source.mask());
            }
        }
    }

    fn wait_for_interrupt(&self) {
        // SAFETY: callback validated in `new`.
        unsafe { (self.wait_for_interrupt)() }
    }
}
