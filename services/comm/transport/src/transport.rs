//! The transport aggregate: rings, signals, gate, and the three execution
//! units, constructed once per attached link.
//!
//! All state that would otherwise be process-wide (buffers, cursors, task
//! handles, the send mutex) lives in one shared aggregate, so a process owns
//! the transport explicitly while keeping single-instance semantics.

use comm_ring::ByteRing;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::framer::{Framer, HandlerId};
use crate::metrics::{MetricsSnapshot, TransportMetrics};
use crate::sender::SendHandle;
use crate::{processor, reader, writer};

/// Configuration for one transport instance.
///
/// The defaults suit a USB virtual COM port: 2 KiB rings, 128-byte read
/// chunks, and a 10 × 1 ms enqueue retry budget.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Handler identity passed to the framer for every byte and packet.
    pub handler: HandlerId,
    /// Inbound ring capacity in bytes (usable capacity is one less).
    pub rx_capacity: usize,
    /// Outbound ring capacity in bytes (usable capacity is one less).
    pub tx_capacity: usize,
    /// Largest single read requested from the link.
    pub read_chunk: usize,
    /// Sleep between enqueue space re-checks.
    pub retry_interval: Duration,
    /// Number of retry intervals before an outbound packet is dropped.
    pub retry_budget: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handler: HandlerId::default(),
            rx_capacity: 2048,
            tx_capacity: 2048,
            read_chunk: 128,
            retry_interval: Duration::from_millis(1),
            retry_budget: 10,
        }
    }
}

/// State shared by the execution units and every send handle.
pub(crate) struct Shared {
    pub(crate) config: TransportConfig,
    pub(crate) framer: Arc<dyn Framer>,
    /// Written only by the reader, read only by the processor.
    pub(crate) rx: ByteRing,
    /// Written only by the send path (under the gate), read only by the
    /// writer.
    pub(crate) tx: ByteRing,
    pub(crate) process_signal: Notify,
    pub(crate) write_signal: Notify,
    /// Serializes concurrent senders; never held across a deframe call.
    pub(crate) gate: Mutex<()>,
    pub(crate) metrics: TransportMetrics,
}

/// A framed packet transport over one byte link.
///
/// Construct with [`Transport::new`], hand out [`SendHandle`]s, then attach
/// the link halves with [`Transport::start`]. The three unit loops run for
/// the life of the link; [`Transport::closed`] resolves once the reader
/// observes the link closing.
pub struct Transport {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
    processor: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Transport {
    /// Build the aggregate: both rings, both signals, the send gate, and the
    /// counters. No task runs until [`Transport::start`].
    pub fn new(framer: Arc<dyn Framer>, config: TransportConfig) -> Self {
        let shared = Arc::new(Shared {
            rx: ByteRing::new(config.rx_capacity),
            tx: ByteRing::new(config.tx_capacity),
            process_signal: Notify::new(),
            write_signal: Notify::new(),
            gate: Mutex::new(()),
            metrics: TransportMetrics::default(),
            framer,
            config,
        });
        Self {
            shared,
            reader: None,
            processor: None,
            writer: None,
        }
    }

    /// Spawn the reader, processor, and writer units on the given link
    /// halves.
    ///
    /// # Panics
    ///
    /// Panics if the transport was already started; a transport serves
    /// exactly one link.
    pub fn start<R, W>(&mut self, link_rx: R, link_tx: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        assert!(self.reader.is_none(), "transport already started");
        self.reader = Some(tokio::spawn(reader::run(Arc::clone(&self.shared), link_rx)));
        self.processor = Some(tokio::spawn(processor::run(Arc::clone(&self.shared))));
        self.writer = Some(tokio::spawn(writer::run(Arc::clone(&self.shared), link_tx)));
    }

    /// A cloneable handle into the send gate.
    pub fn send_handle(&self) -> SendHandle {
        SendHandle::new(Arc::clone(&self.shared))
    }

    /// Current counter values.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Wait until the reader unit exits, i.e. the link closed or failed.
    pub async fn closed(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.await.ok();
        }
    }

    /// Stop the remaining unit loops. The processor and writer never exit on
    /// their own; they are parked on their signals and must be aborted.
    pub fn shutdown(self) {
        for task in [self.reader, self.processor, self.writer].into_iter().flatten() {
            task.abort();
        }
    }
}
