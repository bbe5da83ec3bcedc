//! Link writer unit: drains the outbound ring to the link.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::transport::Shared;

/// Write loop: park until the send path signals, then write each pending
/// byte to the link individually. Link writes may block; that blocking is
/// the physical transport's own backpressure and stalls only this unit.
pub(crate) async fn run<W>(shared: Arc<Shared>, mut link: W)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        shared.write_signal.notified().await;

        let mut drained: u64 = 0;
        while let Some(byte) = shared.tx.pop_byte() {
            if let Err(e) = link.write_all(&[byte]).await {
                warn!("serial link write failed: {}", e);
                return;
            }
            drained += 1;
        }

        if drained > 0 {
            shared.metrics.tx_bytes.fetch_add(drained, Ordering::Relaxed);
            if let Err(e) = link.flush().await {
                warn!("serial link flush failed: {}", e);
                return;
            }
        }
    }
}
