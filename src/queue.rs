//! Fixed-capacity ring buffer of dumped packets.
//!
//! One slot is always left empty so that `head == tail` means empty and
//! `(tail + 1) % N == head` means full, without a separate counter. A queue
//! with `N` slots therefore holds at most `N - 1` packets.
//!
//! `tail` is only written by the producer (the capture handler), `head` only
//! by the consumer (the drain engine). The shared-reference entry points
//! [`PacketQueue::produce`] and [`PacketQueue::consume`] are `unsafe` because
//! the caller has to uphold that single-producer / single-consumer split;
//! `&mut self` callers get the safe [`PacketQueue::try_enqueue`] and
//! [`PacketQueue::try_dequeue`].

use crate::config::PKT_QUEUE_SIZE;
use crate::packet::DumpedPacket;
use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct PacketQueue<const N: usize = PKT_QUEUE_SIZE> {
    /// Next slot to dequeue.
    head: AtomicUsize,
    /// Next slot to enqueue.
    tail: AtomicUsize,
    slots: [UnsafeCell<DumpedPacket>; N],
}

// SAFETY: slot access is partitioned between one producer and one consumer
// by the head/tail protocol; `produce`/`consume` document the obligations.
unsafe impl<const N: usize> Sync for PacketQueue<N> {}

impl<const N: usize> PacketQueue<N> {
    /// Number of packets the queue can hold at once.
    pub const CAPACITY: usize = N - 1;

    pub const fn new() -> Self {
        const { assert!(N >= 2, "packet queue needs at least two slots") };
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: [const { UnsafeCell::new(DumpedPacket::EMPTY) }; N],
        }
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Check if one more packet would collide with the head.
    #[inline]
    pub fn is_full(&self) -> bool {
        let tail = self.tail.load(Ordering::Acquire);
        (tail + 1) % N == self.head.load(Ordering::Acquire)
    }

    /// Current number of queued packets.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail + N - head) % N
    }

    /// Producer side, exclusive access.
    #[inline]
    pub fn try_enqueue(&mut self, pkt: DumpedPacket) -> bool {
        // SAFETY: `&mut self` rules out any concurrent producer or consumer.
        unsafe { self.produce(pkt) }
    }

    /// Consumer side, exclusive access.
    #[inline]
    pub fn try_dequeue(&mut self) -> Option<DumpedPacket> {
        // SAFETY: `&mut self` rules out any concurrent producer or consumer.
        unsafe { self.consume() }
    }

    /// Append a packet unless the queue is full. Returns `false` (and leaves
    /// the queue untouched) when full.
    ///
    /// # Safety
    ///
    /// No other call to `produce` may be in progress. Calls may overlap with
    /// at most one in-progress `consume`.
    pub unsafe fn produce(&self, pkt: DumpedPacket) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let new_tail = (tail + 1) % N;

        if new_tail == self.head.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: slot `tail` is outside [head, tail) so the consumer never
        // reads it until the store below publishes it.
        unsafe { *self.slots[tail].get() = pkt };
        self.tail.store(new_tail, Ordering::Release);
        true
    }

    /// Remove the oldest packet, if any.
    ///
    /// # Safety
    ///
    /// No other call to `consume` may be in progress. Calls may overlap with
    /// at most one in-progress `produce`.
    pub unsafe fn consume(&self) -> Option<DumpedPacket> {
        let head = self.head.load(Ordering::Relaxed);

        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: slot `head` was published by the producer's release store
        // and is not rewritten until `head` moves past it.
        let pkt = unsafe { *self.slots[head].get() };
        self.head.store((head + 1) % N, Ordering::Release);
        Some(pkt)
    }

    /// Drop every queued packet.
    pub fn clear(&mut self) {
        let tail = self.tail.load(Ordering::Relaxed);
        self.head.store(tail, Ordering::Release);
    }

    /// Raw (head, tail) indices, for state comparisons in tests and tools.
    pub fn indices(&self) -> (usize, usize) {
        (
            self.head.load(Ordering::Acquire),
            self.tail.load(Ordering::Acquire),
        )
    }
}

impl<const N: usize> Default for PacketQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for PacketQueue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tail) = self.indices();
        f.debug_struct("PacketQueue")
            .field("head", &head)
            .field("tail", &tail)
            .field("len", &self.len())
            .field("capacity", &Self::CAPACITY)
            .finish()
    }
}
