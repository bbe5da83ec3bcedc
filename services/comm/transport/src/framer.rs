//! Trait boundary to the external packet framing library.
//!
//! The framing protocol itself (delimiters, escaping, checksums, dispatch of
//! complete packets into the command layer) is owned by an external
//! collaborator. The transport only feeds it inbound bytes one at a time and
//! hands it a [`FrameSink`] to emit fully framed outbound packets through.

use async_trait::async_trait;
use std::fmt;

/// Identifies one logical transport among several that may share a framer
/// instance. Fixed at transport construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HandlerId(pub u8);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of pushing a packet through the send path.
///
/// The transport is best-effort by design: a packet that cannot be copied
/// into the outbound ring within the retry budget is dropped whole. Callers
/// must not assume delivery, but they can observe the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The framed packet was fully copied into the outbound ring and the
    /// writer was signaled.
    Delivered,
    /// The outbound ring never freed enough space within the retry budget;
    /// no byte of the packet was written.
    Dropped,
}

impl SendOutcome {
    /// True when the packet reached the outbound ring.
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

/// Output sink handed to the framer when encoding a packet.
///
/// The transport implements this as "copy into the outbound ring with
/// bounded-retry backpressure, then signal the writer once" — all or
/// nothing, never a partial frame.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Deliver one fully framed packet to the link, in order, as a unit.
    async fn emit_frame(&self, frame: &[u8]) -> SendOutcome;
}

/// The external packet protocol library, seen from the transport.
#[async_trait]
pub trait Framer: Send + Sync {
    /// Feed one received byte to the deframer.
    ///
    /// On a complete valid packet the framer may, synchronously on the same
    /// task, dispatch into the command layer — which may re-enter the send
    /// path. The transport guarantees the send gate is not held across this
    /// call, so that re-entry cannot deadlock.
    async fn deframe_byte(&self, byte: u8, handler: HandlerId);

    /// Frame `payload` and push it out through `sink`.
    ///
    /// Called with the send gate held; implementations must emit the frame
    /// through `sink` exactly once, or not at all (returning
    /// [`SendOutcome::Dropped`] for payloads they refuse).
    async fn encode_packet(
        &self,
        payload: &[u8],
        handler: HandlerId,
        sink: &dyn FrameSink,
    ) -> SendOutcome;
}
