use crate::protocol::file::{FILE_BUFFER_PACKETS, MIN_LIMIT_MIB};
use lazy_static::lazy_static;
use log::warn;
use parking_lot::RwLock;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

/// Process-wide channel defaults.
///
/// Values come from built-in defaults, then `TSIO_*` environment variables,
/// then `./tsio.toml` or `./tsio_config.toml`. Channels take a snapshot when
/// they are opened, so a [`Config::reload`] only affects channels opened later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Multicast receive timeout in milliseconds, 0 blocks forever.
    pub rx_timeout_ms: u64,
    /// Requested kernel receive buffer for multicast sockets, in bytes.
    pub rx_socket_buffer: usize,
    /// File transmit buffer size, in TS packets.
    pub file_tx_buffer_packets: usize,
    /// File transmit wrap-around limit, in MiB.
    pub file_tx_limit_mib: u64,
    /// Multicast transmit buffer size, in 7-packet datagrams.
    pub multicast_tx_frames: usize,
    /// Multicast TTL for outgoing datagrams.
    pub multicast_ttl: u32,
}

const CONFIG_PATHS: [&str; 2] = ["./tsio.toml", "./tsio_config.toml"];

const KEYS: [(&str, &str); 6] = [
    ("rx_timeout_ms", "TSIO_RX_TIMEOUT_MS"),
    ("rx_socket_buffer", "TSIO_RX_SOCKET_BUFFER"),
    ("file_tx_buffer_packets", "TSIO_FILE_TX_BUFFER_PACKETS"),
    ("file_tx_limit_mib", "TSIO_FILE_TX_LIMIT_MIB"),
    ("multicast_tx_frames", "TSIO_MULTICAST_TX_FRAMES"),
    ("multicast_ttl", "TSIO_MULTICAST_TTL"),
];

impl Default for Config {
    fn default() -> Self {
        Self {
            rx_timeout_ms: 30_000,
            rx_socket_buffer: 10 * 1024 * 1024,
            file_tx_buffer_packets: FILE_BUFFER_PACKETS,
            file_tx_limit_mib: MIN_LIMIT_MIB,
            multicast_tx_frames: 10,
            multicast_ttl: 1,
        }
    }
}

impl Config {
    fn new() -> Self {
        let mut config = Config::default();

        for (key, var) in KEYS {
            if let Ok(value) = env::var(var) {
                config.apply(key, &value);
            }
        }

        for path in &CONFIG_PATHS {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    config.apply_text(&content);
                }
            }
        }

        config
    }

    /// Applies `key = value` lines; comments and unknown keys are ignored.
    pub fn apply_text(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.apply(key.trim(), value);
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        let result = match key {
            "rx_timeout_ms" => value.parse::<u64>().map(|v| self.rx_timeout_ms = v),
            "rx_socket_buffer" => value.parse::<usize>().map(|v| self.rx_socket_buffer = v),
            "file_tx_buffer_packets" => value
                .parse::<usize>()
                .map(|v| self.file_tx_buffer_packets = v.max(1)),
            "file_tx_limit_mib" => value.parse::<u64>().map(|v| self.file_tx_limit_mib = v),
            "multicast_tx_frames" => value
                .parse::<usize>()
                .map(|v| self.multicast_tx_frames = v.max(1)),
            "multicast_ttl" => value.parse::<u32>().map(|v| self.multicast_ttl = v),
            _ => return,
        };
        if let Err(e) = result {
            warn!("Ignoring config value {} = {:?}: {}", key, value, e);
        }
    }

    /// Re-reads environment and config files into the global config.
    pub fn reload() {
        let new_config = Config::new();
        *CONFIG.write() = new_config;
    }
}

/// Returns a snapshot of the global configuration.
pub fn current() -> Config {
    CONFIG.read().clone()
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# TSIO Configuration
# Defaults shown; remove a line to keep the built-in value.

rx_timeout_ms = 30000
rx_socket_buffer = 10485760
file_tx_buffer_packets = 100
file_tx_limit_mib = 100
multicast_tx_frames = 10
multicast_ttl = 1
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
