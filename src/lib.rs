#![doc(html_root_url = "https://docs.rs/tsio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsio - MPEG Transport Stream channel I/O
//!
//! `tsio` moves MPEG-TS packets between an application and a resource such
//! as a local file or a UDP multicast group, through a uniform channel
//! interface. Resources are named by strings; a registry of protocols picks
//! the one that understands the name and opens a channel for it.
//!
//! ## Features
//!
//! ### Channels
//! - Receive channels: blocking byte reads, packet re-synchronization
//! - Transmit channels: packet-aligned writes, bitrate shaping
//! - Runtime properties and commands (bitrate, timeout, rewind, ...)
//!
//! ### Protocols
//! - Files: looping playback, ring-buffer recording with a size limit
//! - UDP multicast: 7 packets per datagram, null-packet padding
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tsio = "0.1.0"
//! ```
//!
//! ### Relaying a file to a multicast group
//!
//! ```rust,no_run
//! use tsio::capability::{Command, Controllable, Value};
//! use tsio::{open_rx_channel, open_tx_channel, RxChannel, TxChannel};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut rx = open_rx_channel("/var/media/capture.ts")?;
//!     rx.control(Command::Rewind, &[Value::Bool(true)])?;
//!     rx.control(Command::Sync, &[])?;
//!
//!     let mut tx = open_tx_channel("udp://239.1.1.1:1234")?;
//!     tx.control(Command::Bitrate, &[Value::Int(4_000_000)])?;
//!
//!     let mut buf = vec![0u8; 188 * 7];
//!     for _ in 0..1000 {
//!         rx.read(&mut buf)?;
//!         tx.write(&buf)?;
//!     }
//!
//!     tx.close()?;
//!     rx.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `capability`: properties, commands and their values
//! - `channel`: the receive and transmit channel traits
//! - `protocol`: file and multicast protocols, the protocol registry
//! - `format`: TS packet constants, null packets, sync scanning
//! - `utils`: bitrate shaping
//! - `config`: process-wide channel defaults
//! - `error`: error type and result alias
//!

/// Properties, commands and values
pub mod capability;

/// Receive and transmit channel traits
pub mod channel;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// TS packet format
pub mod format;

/// Protocols and the protocol registry
pub mod protocol;

/// Common utilities and helper functions
pub mod utils;

pub use channel::{RxChannel, TxChannel};
pub use error::{ErrorKind, Result, TsioError};
pub use protocol::{open_rx_channel, open_tx_channel, Protocol, ProtocolRegistry};
