//! Processor unit: drains the inbound ring into the framer.

use std::sync::Arc;

use crate::transport::Shared;

/// Process loop: park until the reader signals, drain every byte currently
/// visible, park again. The drain re-checks the live cursors each iteration,
/// so bytes arriving mid-drain are picked up before the next park.
///
/// The framer may dispatch a complete packet into the command layer from
/// here, and that layer may re-enter the send gate on this same task; the
/// gate is never held around `deframe_byte`, so the chain cannot deadlock.
pub(crate) async fn run(shared: Arc<Shared>) {
    loop {
        shared.process_signal.notified().await;

        while let Some(byte) = shared.rx.pop_byte() {
            shared.framer.deframe_byte(byte, shared.config.handler).await;
        }
    }
}
