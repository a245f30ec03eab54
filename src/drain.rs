//! Re-injection drain engine.
//!
//! Two standard-priority entry points keep the transmitter-ready interrupt
//! enabled exactly when the queue has packets and the router is not
//! blocked:
//! - the timer tick re-arms it (there is no "router unblocked" interrupt),
//! - the transmitter-ready handler sends one packet per call and disarms
//!   itself when blocked or out of packets.
//!
//! Both toggle the enable idempotently, so the order in which the platform
//! delivers them does not matter.

use crate::engine::Engine;
use crate::monitor::RouterMonitor;
use crate::packet::DumpedPacket;
use crate::platform::{
    acknowledge_interrupt, CommsReg, FiqGuard, InterruptSource, Platform, TimerReg, VicReg,
};

/// Result of one transmitter-ready interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Router blocked; interrupt disabled until the next tick.
    Blocked,
    /// Nothing queued; interrupt disabled.
    Idle,
    Sent(DumpedPacket),
}

impl<P: Platform> Engine<P> {
    /// Timer tick entry. Returns whether draining was (re-)armed.
    pub fn on_timer_tick(&self) -> bool {
        // clear interrupt in timer,
        self.platform.timer_write(TimerReg::IntClear, 1);

        let mut armed = false;
        if !RouterMonitor::new(&self.platform).is_blocked() {
            let pending = {
                let _fiq = FiqGuard::new(&self.platform);
                !self.queue.is_empty()
            };
            if pending {
                self.set_tx_ready(true);
                armed = true;
            }
        }

        acknowledge_interrupt(&self.platform);
        armed
    }

    /// Transmitter-ready entry: re-inject one packet or disarm.
    pub fn on_transmitter_ready(&self) -> DrainOutcome {
        let outcome = self.drain_one();
        acknowledge_interrupt(&self.platform);
        outcome
    }

    fn drain_one(&self) -> DrainOutcome {
        if RouterMonitor::new(&self.platform).is_blocked() {
            self.set_tx_ready(false);
            return DrainOutcome::Blocked;
        }

        let next = {
            let _fiq = FiqGuard::new(&self.platform);
            // SAFETY: the drain is the queue's only consumer and standard
            // interrupts do not preempt one another.
            unsafe { self.queue.consume() }
        };

        let Some(pkt) = next else {
            self.set_tx_ready(false);
            return DrainOutcome::Idle;
        };

        self.transmit(&pkt);
        self.stats.reinjected.bump();
        DrainOutcome::Sent(pkt)
    }

    /// Write a packet to the comms controller. The key write fires it.
    fn transmit(&self, pkt: &DumpedPacket) {
        self.platform
            .comms_write(CommsReg::TxControl, pkt.control_bits());
        self.platform
            .comms_write(CommsReg::SourceAddress, self.tx_source() | pkt.route_bits());
        if pkt.has_payload() {
            self.platform.comms_write(CommsReg::TxData, pkt.payload);
        }
        self.platform.comms_write(CommsReg::TxKey, pkt.key);
    }

    #[inline]
    pub(crate) fn set_tx_ready(&self, enabled: bool) {
        let reg = if enabled { VicReg::Enable } else { VicReg::Disable };
        self.platform
            .vic_write(reg, InterruptSource::TransmitterReady.mask());
    }
}
