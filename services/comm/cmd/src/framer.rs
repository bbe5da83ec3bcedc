//! Minimal length-prefixed framing for the demo service.
//!
//! The real packet protocol (delimiters, escaping, checksums) is owned by an
//! external library behind the transport's `Framer` trait; this module is a
//! small stand-in so the service runs end-to-end. A frame is a `u16`
//! big-endian payload length followed by the payload bytes.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use comm_transport::{FrameSink, Framer, HandlerId, SendHandle, SendOutcome};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Demo framing errors
#[derive(Error, Debug)]
pub enum FrameError {
    /// Declared payload length exceeds the configured maximum
    #[error("payload length {0} exceeds maximum {1}")]
    Oversize(usize, usize),
}

/// Command-interpreter boundary: acts on one fully decoded packet.
#[async_trait]
pub trait PacketDispatcher: Send + Sync {
    /// Handle a decoded packet. Runs on the processor task, so it may reply
    /// through a [`SendHandle`] without deadlocking the send gate.
    async fn dispatch(&self, payload: Bytes, handler: HandlerId);
}

/// Demo command interpreter: replies to every packet with its own payload.
pub struct EchoDispatcher {
    reply: OnceCell<SendHandle>,
}

impl EchoDispatcher {
    /// Create an unbound echo dispatcher.
    pub fn new() -> Self {
        Self {
            reply: OnceCell::new(),
        }
    }

    /// Attach the send handle used for replies. Later calls are ignored.
    pub fn bind(&self, handle: SendHandle) {
        self.reply.set(handle).ok();
    }
}

impl Default for EchoDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PacketDispatcher for EchoDispatcher {
    async fn dispatch(&self, payload: Bytes, handler: HandlerId) {
        let Some(handle) = self.reply.get() else {
            warn!("dropping packet received before the send path was bound");
            return;
        };
        let outcome = handle.send_packet(&payload).await;
        debug!(
            "echoed {} byte packet on handler {}: {:?}",
            payload.len(),
            handler,
            outcome
        );
    }
}

enum DeframeState {
    /// Waiting for the high length byte
    Idle,
    /// Waiting for the low length byte
    Len { hi: u8 },
    /// Collecting payload bytes
    Payload { want: usize, buf: Vec<u8> },
    /// Draining a frame whose declared length was refused
    Skip { remaining: usize },
}

/// Length-prefixed demo framer.
pub struct LengthPrefixFramer {
    dispatcher: Arc<dyn PacketDispatcher>,
    max_payload: usize,
    state: Mutex<DeframeState>,
}

impl LengthPrefixFramer {
    /// Create a framer dispatching complete packets to `dispatcher`.
    pub fn new(dispatcher: Arc<dyn PacketDispatcher>, max_payload: usize) -> Self {
        Self {
            dispatcher,
            // The length prefix is a u16
            max_payload: max_payload.min(u16::MAX as usize),
            state: Mutex::new(DeframeState::Idle),
        }
    }

    fn frame(&self, payload: &[u8]) -> Result<Bytes, FrameError> {
        if payload.len() > self.max_payload {
            return Err(FrameError::Oversize(payload.len(), self.max_payload));
        }
        let mut buf = BytesMut::with_capacity(payload.len() + 2);
        buf.put_u16(payload.len() as u16);
        buf.put_slice(payload);
        Ok(buf.freeze())
    }

    /// Advance the deframe state machine by one byte. Returns a complete
    /// payload when the byte finished a frame.
    fn advance(&self, byte: u8) -> Result<Option<Bytes>, FrameError> {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            DeframeState::Idle => {
                *state = DeframeState::Len { hi: byte };
                Ok(None)
            }
            DeframeState::Len { hi } => {
                let want = u16::from_be_bytes([*hi, byte]) as usize;
                if want > self.max_payload {
                    // Refuse the frame but consume its declared length so
                    // the stream resynchronizes at the next frame boundary.
                    *state = DeframeState::Skip { remaining: want };
                    return Err(FrameError::Oversize(want, self.max_payload));
                }
                if want == 0 {
                    *state = DeframeState::Idle;
                    return Ok(Some(Bytes::new()));
                }
                *state = DeframeState::Payload {
                    want,
                    buf: Vec::with_capacity(want),
                };
                Ok(None)
            }
            DeframeState::Payload { want, buf } => {
                buf.push(byte);
                if buf.len() == *want {
                    let payload = Bytes::from(std::mem::take(buf));
                    *state = DeframeState::Idle;
                    Ok(Some(payload))
                } else {
                    Ok(None)
                }
            }
            DeframeState::Skip { remaining } => {
                *remaining -= 1;
                if *remaining == 0 {
                    *state = DeframeState::Idle;
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Framer for LengthPrefixFramer {
    async fn deframe_byte(&self, byte: u8, handler: HandlerId) {
        let complete = match self.advance(byte) {
            Ok(complete) => complete,
            Err(e) => {
                warn!("refusing inbound frame: {}", e);
                None
            }
        };
        if let Some(payload) = complete {
            self.dispatcher.dispatch(payload, handler).await;
        }
    }

    async fn encode_packet(
        &self,
        payload: &[u8],
        _handler: HandlerId,
        sink: &dyn FrameSink,
    ) -> SendOutcome {
        match self.frame(payload) {
            Ok(frame) => sink.emit_frame(&frame).await,
            Err(e) => {
                warn!("refusing outbound packet: {}", e);
                SendOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDispatcher;

    #[async_trait]
    impl PacketDispatcher for NullDispatcher {
        async fn dispatch(&self, _payload: Bytes, _handler: HandlerId) {}
    }

    fn framer(max_payload: usize) -> LengthPrefixFramer {
        LengthPrefixFramer::new(Arc::new(NullDispatcher), max_payload)
    }

    #[test]
    fn test_frame_deframe_round_trip() {
        let framer = framer(64);
        let frame = framer.frame(b"hello").unwrap();
        assert_eq!(&frame[..], &[0, 5, b'h', b'e', b'l', b'l', b'o']);

        let mut decoded = None;
        for &byte in frame.iter() {
            if let Some(payload) = framer.advance(byte).unwrap() {
                decoded = Some(payload);
            }
        }
        assert_eq!(decoded.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_zero_length_frame() {
        let framer = framer(64);
        assert_eq!(framer.advance(0).unwrap(), None);
        assert_eq!(framer.advance(0).unwrap(), Some(Bytes::new()));
    }

    #[test]
    fn test_oversized_payload_refused_on_encode() {
        let framer = framer(4);
        assert!(matches!(
            framer.frame(b"hello"),
            Err(FrameError::Oversize(5, 4))
        ));
    }

    #[test]
    fn test_oversized_frame_drained_and_resynced() {
        let framer = framer(4);

        // Declares 8 bytes; the framer refuses it at the length boundary
        // and silently drains the payload.
        assert_eq!(framer.advance(0).unwrap(), None);
        assert!(framer.advance(8).is_err());
        for byte in 0..8u8 {
            assert_eq!(framer.advance(byte).unwrap(), None);
        }

        // The next frame decodes normally.
        let frame = framer.frame(b"ok").unwrap();
        let mut decoded = None;
        for &byte in frame.iter() {
            if let Some(payload) = framer.advance(byte).unwrap() {
                decoded = Some(payload);
            }
        }
        assert_eq!(decoded.as_deref(), Some(&b"ok"[..]));
    }
}
