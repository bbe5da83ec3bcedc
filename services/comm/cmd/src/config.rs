//! Configuration handling for the serial comm service.
//!
//! This module reads the service configuration from a YAML file and
//! environment variables, providing a unified configuration interface.

use anyhow::Result;
use comm_transport::{HandlerId, TransportConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Serial comm service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommConfig {
    /// Listen address for the byte link, e.g. "127.0.0.1:9800"
    pub listen: String,
    /// Inbound ring capacity in bytes
    pub rx_buffer: usize,
    /// Outbound ring capacity in bytes
    pub tx_buffer: usize,
    /// Largest single read requested from the link
    pub read_chunk: usize,
    /// Enqueue retry interval in milliseconds
    pub retry_interval_ms: u64,
    /// Retry intervals before an outbound packet is dropped
    pub retry_budget: u32,
    /// Largest payload the demo framer accepts
    pub max_payload: usize,
    /// Handler identity for this transport
    pub handler: u8,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9800".to_string(),
            rx_buffer: 2048,
            tx_buffer: 2048,
            read_chunk: 128,
            retry_interval_ms: 1,
            retry_budget: 10,
            max_payload: 1024,
            handler: 0,
        }
    }
}

impl CommConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<CommConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?} ({}), using defaults",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!(
                "Config file {:?} not found, using defaults",
                config_path.as_ref()
            );
        }

        // Override with environment variables
        config.apply_environment_overrides();

        info!(
            "Final comm configuration: listen={}, rx_buffer={}, tx_buffer={}, retry={}x{}ms",
            config.listen,
            config.rx_buffer,
            config.tx_buffer,
            config.retry_budget,
            config.retry_interval_ms
        );

        Ok(config)
    }

    fn apply_environment_overrides(&mut self) {
        if let Ok(v) = env::var("COMM_LISTEN") {
            self.listen = v;
        }
        if let Ok(v) = env::var("COMM_RX_BUFFER") {
            match v.parse() {
                Ok(n) => self.rx_buffer = n,
                Err(_) => warn!("Ignoring invalid COMM_RX_BUFFER value: {}", v),
            }
        }
        if let Ok(v) = env::var("COMM_TX_BUFFER") {
            match v.parse() {
                Ok(n) => self.tx_buffer = n,
                Err(_) => warn!("Ignoring invalid COMM_TX_BUFFER value: {}", v),
            }
        }
        if let Ok(v) = env::var("COMM_RETRY_BUDGET") {
            match v.parse() {
                Ok(n) => self.retry_budget = n,
                Err(_) => warn!("Ignoring invalid COMM_RETRY_BUDGET value: {}", v),
            }
        }
        if let Ok(v) = env::var("COMM_MAX_PAYLOAD") {
            match v.parse() {
                Ok(n) => self.max_payload = n,
                Err(_) => warn!("Ignoring invalid COMM_MAX_PAYLOAD value: {}", v),
            }
        }
    }

    /// Derive the transport configuration for one attached link
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            handler: HandlerId(self.handler),
            rx_capacity: self.rx_buffer,
            tx_capacity: self.tx_buffer,
            read_chunk: self.read_chunk,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            retry_budget: self.retry_budget,
        }
    }
}
