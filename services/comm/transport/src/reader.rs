//! Link reader unit: pulls bytes from the link into the inbound ring.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

use crate::transport::Shared;

/// Read loop. Exits when the link reports EOF or an I/O error; there is no
/// backpressure on this path, overrun overwrites and is counted.
pub(crate) async fn run<R>(shared: Arc<Shared>, mut link: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut chunk = vec![0u8; shared.config.read_chunk];

    loop {
        match link.read(&mut chunk).await {
            Ok(0) => {
                info!("serial link closed by peer");
                return;
            }
            Ok(n) => {
                for &byte in &chunk[..n] {
                    if shared.rx.available() == 0 {
                        // The reader never waits for space: it overwrites
                        // the oldest unprocessed byte and counts the loss.
                        shared.metrics.rx_overruns.fetch_add(1, Ordering::Relaxed);
                    }
                    shared.rx.push_byte(byte);
                }
                shared.metrics.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);
                // One coalescing wakeup per chunk, only when data arrived.
                shared.process_signal.notify_one();
            }
            Err(e) => {
                warn!("serial link read failed: {}", e);
                return;
            }
        }
    }
}
