//! Loss and throughput counters for the transport.
//!
//! Both loss modes of the design (inbound overrun, outbound drop after the
//! retry budget) are intentional best-effort policies, not errors. These
//! counters make them observable without changing the behavior.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the three execution units and the send path.
#[derive(Debug, Default)]
pub struct TransportMetrics {
    pub(crate) rx_bytes: AtomicU64,
    pub(crate) tx_bytes: AtomicU64,
    pub(crate) rx_overruns: AtomicU64,
    pub(crate) packets_sent: AtomicU64,
    pub(crate) packets_dropped: AtomicU64,
}

impl TransportMetrics {
    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_overruns: self.rx_overruns.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the transport counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Bytes pulled from the link by the reader.
    pub rx_bytes: u64,
    /// Bytes drained to the link by the writer.
    pub tx_bytes: u64,
    /// Inbound bytes pushed while the ring had no space left; each one
    /// overwrote a not-yet-processed byte.
    pub rx_overruns: u64,
    /// Packets that reached the outbound ring.
    pub packets_sent: u64,
    /// Packets abandoned after the enqueue retry budget expired.
    pub packets_dropped: u64,
}
