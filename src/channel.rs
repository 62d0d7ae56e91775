//! Receive and transmit channel traits.
//!
//! A channel owns exactly one OS resource (a file handle, or a UDP socket and
//! its group membership). It is created by a [`Protocol`](crate::protocol::Protocol),
//! used by a single owner, and unusable after [`close`](RxChannel::close).
//! Because `close` takes `&mut self` two closes can never run at once; the
//! handle is taken out of an `Option` so only the first close releases it.
//!
//! Blocking calls (`read`, `write`, pacing sleeps) are not interrupted by a
//! close from elsewhere; there is no cancellation beyond dropping the channel.

use crate::capability::{Controllable, Queryable};
use crate::error::{Result, TsioError};
use std::ops::Range;

/// Sequential TS byte-stream reader.
pub trait RxChannel: Queryable + Controllable + Send {
    /// Reads up to `buf.len()` bytes, returning how many were read.
    ///
    /// An exhausted source yields [`TsioError::EndOfStream`], never `Ok(0)`
    /// for a non-empty `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads into `buf[offset..offset + length]`.
    fn read_into(&mut self, buf: &mut [u8], offset: usize, length: usize) -> Result<usize> {
        let range = checked_range(buf.len(), offset, length)?;
        self.read(&mut buf[range])
    }

    /// Releases the underlying resource. Further calls are no-ops.
    fn close(&mut self) -> Result<()>;

    /// Whether `close` has run.
    fn is_closed(&self) -> bool;
}

/// Sequential TS byte-stream writer.
pub trait TxChannel: Queryable + Controllable + Send {
    /// Writes whole TS packets. `data.len()` must be a multiple of 188; a
    /// misaligned write fails before anything is buffered.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Writes `buf[offset..offset + length]`.
    fn write_from(&mut self, buf: &[u8], offset: usize, length: usize) -> Result<()> {
        let range = checked_range(buf.len(), offset, length)?;
        self.write(&buf[range])
    }

    /// Flushes pending data without pacing and releases the underlying
    /// resource. Further calls are no-ops.
    fn close(&mut self) -> Result<()>;

    /// Whether `close` has run.
    fn is_closed(&self) -> bool;
}

pub(crate) fn checked_range(len: usize, offset: usize, length: usize) -> Result<Range<usize>> {
    match offset.checked_add(length) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(TsioError::InvalidArgument(format!(
            "Invalid offset/length: {}+{} exceeds buffer of {} bytes",
            offset, length, len
        ))),
    }
}
