//! Dropped-packet capture handler (fast interrupt).
//!
//! Runs at the highest priority: nothing in the engine preempts it, so it
//! touches the queue tail without any locking. It never blocks, allocates
//! or logs.

use crate::config::RTR_DOVRFLW_MASK;
use crate::engine::Engine;
use crate::packet::DumpedPacket;
use crate::platform::{Platform, RouterReg};

/// What happened to a dumped packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Class disabled; discarded without touching the statistics, including
    /// a router overflow flagged alongside it.
    Filtered,
    Queued,
    /// Queue full; discarded and counted.
    Overflowed,
}

impl<P: Platform> Engine<P> {
    /// Fast interrupt entry: pull the dumped packet out of the router and
    /// queue it for re-injection.
    pub fn on_dropped_packet(&self) -> CaptureOutcome {
        // get packet from router,
        let hdr = self.platform.router_read(RouterReg::DumpHeader);
        let pld = self.platform.router_read(RouterReg::DumpData);
        let key = self.platform.router_read(RouterReg::DumpKey);

        // clear dump status and interrupt in router,
        let dstat = self.platform.router_read(RouterReg::DumpStatus);

        let pkt = DumpedPacket::new(hdr, key, pld);
        if !self.filter.is_enabled(pkt.packet_type()) {
            return CaptureOutcome::Filtered;
        }

        // the router lost another packet before we got to this one
        if dstat & RTR_DOVRFLW_MASK != 0 {
            self.stats.missed_dropped.bump();
        }

        self.stats.dropped.bump();

        // SAFETY: this handler is the queue's only producer and, running at
        // the highest priority, can never be re-entered.
        if unsafe { self.queue.produce(pkt) } {
            CaptureOutcome::Queued
        } else {
            self.stats.queue_overflows.bump();
            CaptureOutcome::Overflowed
        }
    }
}
