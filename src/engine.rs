//! Engine context and startup wiring.
//!
//! One [`Engine`] owns every piece of re-injection state for the lifetime
//! of the process. Interrupt handlers receive it by shared reference: the
//! priority rules (fast capture > standard drain/command > idle) plus the
//! single-writer layout of each field make that sound without locks, and the
//! one unavoidable critical section is the drain's [`crate::platform::FiqGuard`].

use crate::capture::CaptureOutcome;
use crate::config::{CC_SAR_SOURCE_MASK, EngineConfig, TIMER_CONTROL_START};
use crate::filter::FilterState;
use crate::monitor::{RouterMonitor, TimeoutKind};
use crate::platform::{CommsReg, InterruptSource, Platform, TimerReg, VicReg};
use crate::queue::PacketQueue;
use crate::stats::{Statistics, StatsSnapshot};
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::info;

pub struct Engine<P: Platform> {
    pub(crate) platform: P,
    pub(crate) cfg: EngineConfig,
    pub(crate) queue: PacketQueue,
    pub(crate) stats: Statistics,
    pub(crate) filter: FilterState,
    running: AtomicBool,
    /// Low 16 bits of the comms controller SAR (point-to-point source id).
    tx_source: AtomicU32,
}

impl<P: Platform> fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("queue", &self.queue)
            .field("stats", &self.stats.snapshot())
            .field("filter_mask", &self.filter.mask())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Notable interrupt results, mainly for simulations and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Captured(CaptureOutcome),
    Ticked { armed: bool },
    Drained(crate::drain::DrainOutcome),
    /// Command interrupts are serviced through a transport.
    Deferred,
}

impl<P: Platform> Engine<P> {
    /// Build an engine with configured defaults. Nothing touches the
    /// hardware until [`Engine::start`].
    pub fn new(platform: P, cfg: EngineConfig) -> Self {
        Self {
            platform,
            cfg,
            queue: PacketQueue::new(),
            stats: Statistics::new(),
            filter: FilterState::from_mask(cfg.initial_packet_types),
            running: AtomicBool::new(true),
            tx_source: AtomicU32::new(0),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> EngineConfig {
        self.cfg
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn packet_type_mask(&self) -> u32 {
        self.filter.mask()
    }

    pub fn queue(&self) -> &PacketQueue {
        &self.queue
    }

    pub fn router(&self) -> RouterMonitor<'_, P> {
        RouterMonitor::new(&self.platform)
    }

    pub fn timeout(&self, kind: TimeoutKind) -> u8 {
        self.router().timeout(kind)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn tx_source(&self) -> u32 {
        self.tx_source.load(Ordering::Relaxed)
    }

    /// Configure the timer, comms controller and router, install the
    /// handlers and start ticking.
    pub fn start(&self) {
        self.configure_timer();
        self.configure_comms_controller();
        self.router()
            .configure(self.cfg.initial_timeout, self.cfg.initial_emergency_timeout);

        self.stats.reset();
        self.filter.set_mask(self.cfg.initial_packet_types);

        // Disable the interrupts that we are configuring
        let owned = InterruptSource::TimerTick.mask() | InterruptSource::DroppedPacket.mask();
        self.platform.vic_write(VicReg::Disable, owned);
        self.platform
            .vic_write(VicReg::Disable, InterruptSource::TransmitterReady.mask());

        for source in [
            InterruptSource::Command,
            InterruptSource::TransmitterReady,
            InterruptSource::TimerTick,
            InterruptSource::DroppedPacket,
        ] {
            self.platform.bind_interrupt(source);
        }

        // Enable interrupts and timer
        self.platform.vic_write(VicReg::Enable, owned);
        self.platform
            .timer_write(TimerReg::Control, TIMER_CONTROL_START);

        info!(
            tick_us = self.cfg.tick_period_us,
            wait1 = self.cfg.initial_timeout,
            wait2 = self.cfg.initial_emergency_timeout,
            packet_types = self.cfg.initial_packet_types,
            "reinjector started"
        );
    }

    fn configure_timer(&self) {
        let load = self
            .platform
            .cpu_clock_mhz()
            .saturating_mul(self.cfg.tick_period_us);
        self.platform.timer_write(TimerReg::Control, 0);
        self.platform.timer_write(TimerReg::IntClear, 1);
        self.platform.timer_write(TimerReg::Load, load);
        self.platform.timer_write(TimerReg::BackgroundLoad, load);
    }

    fn configure_comms_controller(&self) {
        let sar = self.platform.comms_read(CommsReg::SourceAddress) & CC_SAR_SOURCE_MASK;
        self.tx_source.store(sar, Ordering::Relaxed);
    }

    /// Disable every interrupt this engine owns and stop the idle loop.
    /// Queued packets are abandoned.
    pub(crate) fn shutdown(&self) {
        let owned = InterruptSource::TimerTick.mask() | InterruptSource::DroppedPacket.mask();
        self.platform.vic_write(VicReg::Disable, owned);
        self.platform
            .vic_write(VicReg::Disable, InterruptSource::TransmitterReady.mask());
        self.platform.vic_write(VicReg::Select, 0);
        self.running.store(false, Ordering::Release);
        info!(queued = self.queue.len(), "reinjector exiting");
    }

    /// Idle loop: park until the exit command clears `running`.
    pub fn run(&self) {
        while self.is_running() {
            self.platform.wait_for_interrupt();
        }
    }

    /// Invoke the handler bound to `source`.
    pub fn dispatch(&self, source: InterruptSource) -> HandlerOutcome {
        match source {
            InterruptSource::DroppedPacket => HandlerOutcome::Captured(self.on_dropped_packet()),
            InterruptSource::TimerTick => HandlerOutcome::Ticked {
                armed: self.on_timer_tick(),
            },
            InterruptSource::TransmitterReady => {
                HandlerOutcome::Drained(self.on_transmitter_ready())
            }
            InterruptSource::Command => HandlerOutcome::Deferred,
        }
    }
}
