use super::types::*;
use crate::error::{Result, TsioError};
use bytes::{BufMut, BytesMut};
use lazy_static::lazy_static;

lazy_static! {
    static ref NULL_PACKET: [u8; TS_PACKET_SIZE] = {
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        TSHeader::null().write_to(&mut buf);
        buf.put_bytes(0xff, TS_PACKET_SIZE - TS_HEADER_SIZE);
        let mut packet = [0u8; TS_PACKET_SIZE];
        packet.copy_from_slice(&buf);
        packet
    };
}

/// The 188-byte null packet: `47 1F FF 1F` followed by 184 bytes of `FF`.
pub fn null_packet() -> &'static [u8; TS_PACKET_SIZE] {
    &NULL_PACKET
}

/// Overwrites `buf` with back-to-back null packets.
///
/// `buf.len()` must be a multiple of [`TS_PACKET_SIZE`]; a trailing partial
/// packet is left untouched.
pub fn fill_null_packets(buf: &mut [u8]) {
    for chunk in buf.chunks_exact_mut(TS_PACKET_SIZE) {
        chunk.copy_from_slice(null_packet());
    }
}

/// Fails with an invalid-argument error unless `len` covers whole packets.
pub fn check_packet_aligned(len: usize) -> Result<()> {
    if len % TS_PACKET_SIZE != 0 {
        return Err(TsioError::InvalidArgument(format!(
            "Invalid length: {}, must be multiple of {} bytes",
            len, TS_PACKET_SIZE
        )));
    }
    Ok(())
}

/// Number of consecutive packets that must line up before a stream counts as synced.
pub const SYNC_RUN: usize = 5;

/// Tracks a run of sync bytes spaced one packet apart.
///
/// Feed it every byte in stream order. Once a sync byte is seen the next
/// `187` bytes are skipped and the byte after them must be a sync byte too;
/// any miss restarts the search from the following byte.
#[derive(Debug, Default)]
pub(crate) struct SyncScanner {
    found: usize,
    skip: usize,
}

impl SyncScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bytes that can be skipped without inspection before the next candidate.
    pub(crate) fn pending_skip(&self) -> usize {
        self.skip
    }

    pub(crate) fn skipped(&mut self, n: usize) {
        self.skip -= n.min(self.skip);
    }

    /// Inspects the next candidate byte; returns true when the run is complete.
    ///
    /// After completion the cursor has still to skip the rest of the last packet,
    /// see [`SyncScanner::pending_skip`].
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        debug_assert_eq!(self.skip, 0);
        if byte == SYNC_BYTE {
            self.found += 1;
            self.skip = TS_PACKET_SIZE - 1;
        } else {
            self.found = 0;
        }
        self.found >= SYNC_RUN
    }

    pub(crate) fn reset(&mut self) {
        self.found = 0;
        self.skip = 0;
    }
}
