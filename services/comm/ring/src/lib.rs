//! Fixed-capacity circular byte buffers with wrapping read/write cursors.
//!
//! This crate provides the byte ring used on both sides of the serial
//! transport pipeline: once for bytes arriving from the link and once for
//! bytes waiting to go out. Each ring has exactly one producer-side and one
//! consumer-side task, so the contents need no lock; the cursors are the
//! only cross-task state and are kept coherent with sequentially-consistent
//! atomics.
//!
//! ## Semantics
//!
//! - One slot is always left unused to tell a full ring from an empty one,
//!   so a ring of capacity C holds at most C−1 unread bytes.
//! - `push_byte` never checks for space. Reserving space first (via
//!   [`ByteRing::available`]) is the producer's contract; pushing into a
//!   full ring overwrites the oldest unread byte.
//! - `pop_byte` returns `None` when the ring is empty.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// A fixed-capacity circular byte buffer for one producer and one consumer.
///
/// Storage is allocated once at construction and never resized. Cursor
/// updates use `SeqCst` ordering so a byte stored before a cursor advance is
/// visible to the peer task that observes the advance.
#[derive(Debug)]
pub struct ByteRing {
    slots: Box<[AtomicU8]>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
}

impl ByteRing {
    /// Create a ring with `capacity` byte slots (usable capacity is one
    /// less).
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`; such a ring could never hold a byte.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2");
        let slots = (0..capacity).map(|_| AtomicU8::new(0)).collect();
        Self {
            slots,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Total number of slots, one of which is always kept unused.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of unread bytes currently in the ring.
    pub fn occupancy(&self) -> usize {
        let wp = self.write_pos.load(Ordering::SeqCst);
        let rp = self.read_pos.load(Ordering::SeqCst);
        if wp >= rp {
            wp - rp
        } else {
            self.capacity() - rp + wp
        }
    }

    /// Number of bytes that can be pushed without overwriting unread data.
    pub fn available(&self) -> usize {
        self.capacity() - 1 - self.occupancy()
    }

    /// True when no unread byte remains.
    pub fn is_empty(&self) -> bool {
        self.read_pos.load(Ordering::SeqCst) == self.write_pos.load(Ordering::SeqCst)
    }

    /// Append one byte at the write cursor and advance it.
    ///
    /// The producer must have confirmed space via [`ByteRing::available`];
    /// pushing into a full ring silently overwrites the oldest unread byte.
    pub fn push_byte(&self, byte: u8) {
        let wp = self.write_pos.load(Ordering::SeqCst);
        // The slot store is published by the SeqCst cursor store below.
        self.slots[wp].store(byte, Ordering::Relaxed);
        self.write_pos
            .store((wp + 1) % self.capacity(), Ordering::SeqCst);
    }

    /// Remove and return the byte at the read cursor, or `None` when empty.
    pub fn pop_byte(&self) -> Option<u8> {
        let rp = self.read_pos.load(Ordering::SeqCst);
        if rp == self.write_pos.load(Ordering::SeqCst) {
            return None;
        }
        let byte = self.slots[rp].load(Ordering::Relaxed);
        self.read_pos
            .store((rp + 1) % self.capacity(), Ordering::SeqCst);
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_ring() {
        let ring = ByteRing::new(8);
        assert!(ring.is_empty());
        assert_eq!(ring.occupancy(), 0);
        assert_eq!(ring.available(), 7);
        assert_eq!(ring.pop_byte(), None);
    }

    #[test]
    fn test_push_pop_order() {
        let ring = ByteRing::new(8);
        for b in 1..=5u8 {
            ring.push_byte(b);
        }
        assert_eq!(ring.occupancy(), 5);
        assert_eq!(ring.available(), 2);
        for b in 1..=5u8 {
            assert_eq!(ring.pop_byte(), Some(b));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraparound_round_trip() {
        let ring = ByteRing::new(8);

        // Walk the cursors most of the way around, then push a run that
        // wraps past the last slot back to index 0.
        for _ in 0..6 {
            ring.push_byte(0xAA);
            assert_eq!(ring.pop_byte(), Some(0xAA));
        }
        for b in 10..17u8 {
            ring.push_byte(b);
        }
        assert_eq!(ring.occupancy(), 7);
        assert_eq!(ring.available(), 0);
        for b in 10..17u8 {
            assert_eq!(ring.pop_byte(), Some(b));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_occupancy_never_exceeds_usable_capacity() {
        let ring = ByteRing::new(8);
        for b in 0..100u8 {
            ring.push_byte(b);
            assert!(ring.occupancy() <= 7);
        }
    }

    #[test]
    #[should_panic(expected = "ring capacity must be at least 2")]
    fn test_degenerate_capacity_rejected() {
        let _ = ByteRing::new(1);
    }

    #[test]
    fn test_spsc_threads_no_loss_no_duplication() {
        let ring = Arc::new(ByteRing::new(64));
        let total: usize = 10_000;

        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for i in 0..total {
                    // Stay within capacity so overrun loss cannot occur.
                    while ring.available() == 0 {
                        std::thread::yield_now();
                    }
                    ring.push_byte(i as u8);
                }
            })
        };

        let consumer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                let mut received = Vec::with_capacity(total);
                while received.len() < total {
                    match ring.pop_byte() {
                        Some(b) => received.push(b),
                        None => std::thread::yield_now(),
                    }
                }
                received
            })
        };

        producer.join().unwrap();
        let received = consumer.join().unwrap();
        assert_eq!(received.len(), total);
        for (i, b) in received.iter().enumerate() {
            assert_eq!(*b, i as u8);
        }
    }
}
