//! Byte-link transport for framed packets: dual ring pipeline, three
//! execution units, send gate, and bounded backpressure.
//!
//! This crate moves a byte-oriented serial link (a USB virtual COM port, a
//! TCP socket standing in for one, or any `AsyncRead`/`AsyncWrite` pair)
//! into and out of a framed packet protocol. Inbound bytes are absorbed into
//! a circular buffer by a dedicated reader unit and drained into the framer
//! by a processor unit; outbound packets are framed under a send gate and
//! copied into a second circular buffer that a writer unit drains to the
//! link.
//!
//! ## Features
//!
//! - **Dual SPSC rings**: fixed capacity, allocated once, never resized
//! - **Three execution units**: reader, processor, writer — persistent
//!   tasks, parked when idle, woken by coalescing signals
//! - **Send gate**: one mutex serializing concurrent packet producers
//! - **Bounded backpressure**: outbound enqueue retries on a fixed interval
//!   and drops the whole packet when the budget expires — never a partial
//!   frame
//! - **Observable loss**: overrun and drop counters, and a named
//!   [`SendOutcome`] instead of silent failure
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use comm_transport::{FrameSink, Framer, HandlerId, SendOutcome, Transport, TransportConfig};
//! use std::sync::Arc;
//!
//! /// A framer that passes payloads through unframed.
//! struct RawFramer;
//!
//! #[async_trait]
//! impl Framer for RawFramer {
//!     async fn deframe_byte(&self, byte: u8, handler: HandlerId) {
//!         println!("handler {handler}: received byte {byte:#04x}");
//!     }
//!
//!     async fn encode_packet(
//!         &self,
//!         payload: &[u8],
//!         _handler: HandlerId,
//!         sink: &dyn FrameSink,
//!     ) -> SendOutcome {
//!         sink.emit_frame(payload).await
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (_host, device) = tokio::io::duplex(256);
//! let (link_rx, link_tx) = tokio::io::split(device);
//!
//! let mut transport = Transport::new(Arc::new(RawFramer), TransportConfig::default());
//! let handle = transport.send_handle();
//! transport.start(link_rx, link_tx);
//!
//! match handle.send_packet(b"hello").await {
//!     SendOutcome::Delivered => println!("queued for the link"),
//!     SendOutcome::Dropped => println!("outbound buffer never freed up"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod framer;
pub mod metrics;
mod processor;
mod reader;
pub mod sender;
pub mod transport;
mod writer;

// Re-export main types
pub use framer::{FrameSink, Framer, HandlerId, SendOutcome};
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use sender::SendHandle;
pub use transport::{Transport, TransportConfig};
