//! # Utility Functions and Types
//!
//! Helpers shared by the transmit channels.
//!
//! ## Rate Shaping
//!
//! The rate module paces batched output to a bitrate by sleeping on the
//! calling thread:
//!
//! ```rust
//! use tsio::utils::RateShaper;
//! use std::num::NonZeroU32;
//!
//! let mut shaper = RateShaper::new();
//! shaper.set_bitrate(NonZeroU32::new(15_000_000));
//! let slept = shaper.pace(1316);
//! assert!(slept.as_millis() < 10);
//! ```

/// Bitrate pacing
pub mod rate;

pub use rate::RateShaper;
