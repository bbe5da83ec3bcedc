//! Serial comm service binary.
//!
//! Bridges a byte link (a TCP socket standing in for a USB virtual COM port)
//! into the framed packet pipeline: reader, processor, and writer units over
//! dual circular buffers, with a demo length-prefixed framer and an echo
//! command interpreter on top.

use clap::Parser;
use comm_transport::Transport;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod framer;

use config::CommConfig;
use framer::{EchoDispatcher, LengthPrefixFramer};

/// Framed packet transport over a serial byte link
#[derive(Parser, Debug)]
#[command(name = "serial-comm", version, about = "Framed packet transport over a serial byte link")]
struct Args {
    /// Listen address for the byte link, e.g. 127.0.0.1:9800
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Inbound ring capacity in bytes
    #[arg(long)]
    rx_buffer: Option<usize>,

    /// Outbound ring capacity in bytes
    #[arg(long)]
    tx_buffer: Option<usize>,

    /// Enqueue retry interval, e.g. 1ms
    #[arg(long)]
    retry_interval: Option<humantime::Duration>,

    /// Retry intervals before an outbound packet is dropped
    #[arg(long)]
    retry_budget: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("serial_comm={}", args.log_level).parse()?)
        .add_directive(format!("comm_transport={}", args.log_level).parse()?)
        .add_directive(format!("comm_ring={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Starting serial comm service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from file, then apply command-line overrides
    let mut comm_config = CommConfig::load_from_file(&args.config)?;
    if let Some(listen) = args.listen {
        comm_config.listen = listen.to_string();
    }
    if let Some(n) = args.rx_buffer {
        comm_config.rx_buffer = n;
    }
    if let Some(n) = args.tx_buffer {
        comm_config.tx_buffer = n;
    }
    if let Some(interval) = args.retry_interval {
        comm_config.retry_interval_ms = Duration::from(interval).as_millis() as u64;
    }
    if let Some(n) = args.retry_budget {
        comm_config.retry_budget = n;
    }

    let listen_addr: SocketAddr = comm_config.listen.parse()?;
    let transport_config = comm_config.transport_config();

    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening for a serial link on {}", listen_addr);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Serial link attached from {}", peer);
        if let Err(e) = socket.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }

        let dispatcher = Arc::new(EchoDispatcher::new());
        let framer = Arc::new(LengthPrefixFramer::new(
            dispatcher.clone(),
            comm_config.max_payload,
        ));

        let mut transport = Transport::new(framer, transport_config.clone());
        dispatcher.bind(transport.send_handle());

        let (link_rx, link_tx) = socket.into_split();
        transport.start(link_rx, link_tx);

        // One link at a time; further connections wait in the accept backlog
        transport.closed().await;

        match serde_json::to_string(&transport.metrics()) {
            Ok(stats) => info!("Serial link detached from {}: {}", peer, stats),
            Err(_) => info!("Serial link detached from {}", peer),
        }
        transport.shutdown();
    }
}
