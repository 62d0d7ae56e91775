//! # Protocols
//!
//! A [`Protocol`] recognizes resource strings and opens channels for them.
//! Two are built in:
//!
//! - [`FileProtocol`]: local paths and `file:` URIs
//! - [`MulticastProtocol`]: `udp://<multicast-group>:<port>`
//!
//! The [`ProtocolRegistry`] asks each protocol in registration order and uses
//! the first that accepts. A process-wide registry pre-loaded with both
//! protocols backs [`open_rx_channel`] / [`open_tx_channel`].
//!
//! ```rust,no_run
//! use tsio::protocol::open_rx_channel;
//! use tsio::RxChannel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut channel = open_rx_channel("/var/media/capture.ts")?;
//! let mut buf = vec![0u8; 188 * 7];
//! let n = channel.read(&mut buf)?;
//! println!("read {} bytes", n);
//! channel.close()?;
//! # Ok(())
//! # }
//! ```

use crate::capability::Queryable;
use crate::channel::{RxChannel, TxChannel};
use crate::error::Result;

/// File protocol and channels
pub mod file;

/// UDP multicast protocol and channels
pub mod multicast;

/// Ordered protocol lookup
pub mod registry;

pub use file::{FileProtocol, FileRxChannel, FileTxChannel};
pub use multicast::{MulticastProtocol, MulticastRxChannel, MulticastTxChannel};
pub use registry::{
    open_rx_channel, open_tx_channel, register_protocol, resolve_protocol, ProtocolRegistry,
};

/// Version reported by the built-in protocols.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Recognizer and factory for one kind of resource.
pub trait Protocol: Queryable + Send + Sync {
    /// Whether this protocol handles `resource`.
    ///
    /// An `Err` means the check itself failed; the registry logs it and
    /// treats the protocol as not applicable.
    fn accepts(&self, resource: &str) -> Result<bool>;

    /// Opens a receive channel. Fails with
    /// [`TsioError::UnsupportedResource`](crate::TsioError::UnsupportedResource)
    /// when the resource is not one of this protocol's.
    fn open_rx(&self, resource: &str) -> Result<Box<dyn RxChannel>>;

    /// Opens a transmit channel, see [`Protocol::open_rx`].
    fn open_tx(&self, resource: &str) -> Result<Box<dyn TxChannel>>;
}
