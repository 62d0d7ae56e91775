//! # MPEG Transport Stream (TS) packet framing
//!
//! The channels never look inside TS payloads. They only need to know:
//!
//! - packets are [`TS_PACKET_SIZE`] bytes and start with [`SYNC_BYTE`]
//! - UDP carries [`PACKETS_PER_DATAGRAM`] packets per datagram ([`DATAGRAM_SIZE`] bytes)
//! - underfilled output is padded with null packets (PID [`PID_NULL`])
//!
//! ```rust
//! use tsio::format::ts::{null_packet, SYNC_BYTE, TS_PACKET_SIZE};
//!
//! let packet = null_packet();
//! assert_eq!(packet.len(), TS_PACKET_SIZE);
//! assert_eq!(packet[0], SYNC_BYTE);
//! assert_eq!(&packet[1..3], &[0x1f, 0xff]);
//! ```

/// Null packets, alignment checks and sync scanning
pub mod packet;

/// Core TS types and constants
pub mod types;

pub use packet::{check_packet_aligned, fill_null_packets, null_packet, SYNC_RUN};
pub(crate) use packet::SyncScanner;
pub use types::{
    TSHeader, DATAGRAM_SIZE, MAX_DATAGRAM_SIZE, PACKETS_PER_DATAGRAM, PID_NULL,
    SYNC_BYTE, TS_HEADER_SIZE, TS_PACKET_SIZE,
};
