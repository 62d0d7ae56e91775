use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;

/// Broad classification of a [`TsioError`].
///
/// Lets callers tell "fix your call" apart from "the stream ended or broke"
/// and from "nothing could be opened for this resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse: bad range, malformed command argument, misaligned length.
    InvalidArgument,
    /// Closed channel, end of stream, timeout or OS-level I/O failure.
    Transport,
    /// No protocol accepts the resource, or no usable network interface.
    Resolution,
}

/// Errors raised by protocols, channels and the registry.
#[derive(Error, Debug)]
pub enum TsioError {
    /// Bad range, command argument or packet alignment
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Numeric text that does not parse
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),

    /// Command not listed by the channel
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// Operation on a closed channel
    #[error("channel closed")]
    Closed,

    /// Source exhausted
    #[error("end of stream")]
    EndOfStream,

    /// No data within the receive timeout
    #[error("receive timed out after {0:?}")]
    Timeout(Duration),

    /// Sync scan gave up
    #[error("no TS sync pattern found in stream")]
    SyncLost,

    /// OS-level I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The protocol does not apply to this resource; the registry moves on.
    #[error("unsupported resource {resource}: {reason}")]
    UnsupportedResource {
        /// The resource string as given
        resource: String,
        /// Why the protocol declined it
        reason: String,
    },

    /// No registered protocol accepts the resource
    #[error("no protocol accepts resource: {0}")]
    NoMatchingProtocol(String),

    /// No interface can carry the multicast group
    #[error("no usable network interface")]
    NoUsableInterface,
}

impl TsioError {
    /// Broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TsioError::InvalidArgument(_)
            | TsioError::ParseInt(_)
            | TsioError::UnsupportedCommand(_) => ErrorKind::InvalidArgument,
            TsioError::Closed
            | TsioError::EndOfStream
            | TsioError::Timeout(_)
            | TsioError::SyncLost
            | TsioError::Io(_) => ErrorKind::Transport,
            TsioError::UnsupportedResource { .. }
            | TsioError::NoMatchingProtocol(_)
            | TsioError::NoUsableInterface => ErrorKind::Resolution,
        }
    }

    /// Whether the caller is at fault.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Whether the source is exhausted.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, TsioError::EndOfStream)
    }

    pub(crate) fn unsupported(resource: &str, reason: impl Into<String>) -> Self {
        TsioError::UnsupportedResource {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for tsio operations
pub type Result<T> = std::result::Result<T, TsioError>;
