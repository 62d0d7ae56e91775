use crate::capability::{bitrate_arg, single_arg, Command, Controllable, Property, Queryable, Value};
use crate::channel::TxChannel;
use crate::config;
use crate::error::{Result, TsioError};
use crate::format::ts::{check_packet_aligned, TS_PACKET_SIZE};
use crate::utils::RateShaper;
use bytes::BytesMut;
use log::{debug, error, info};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::num::NonZeroU32;
use std::path::Path;

/// Default buffer size in packets; small enough to keep pacing smooth.
pub const FILE_BUFFER_PACKETS: usize = 100;

/// Smallest accepted size limit, in MiB.
pub const MIN_LIMIT_MIB: u64 = 100;

const MIB: u64 = 1024 * 1024;

/// Writes TS packets to a file, optionally paced to a bitrate.
///
/// Output is buffered and written a buffer at a time. Once the file would
/// grow past its size limit, writing starts over from offset 0, so the file
/// acts as a ring. Closing truncates the file at the last write position.
pub struct FileTxChannel {
    file: Option<File>,
    target_name: String,
    buf: BytesMut,
    capacity: usize,
    position: u64,
    limit: u64,
    shaper: RateShaper,
}

impl FileTxChannel {
    /// Creates or truncates the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let config = config::current();
        let capacity = config.file_tx_buffer_packets.max(1) * TS_PACKET_SIZE;
        let limit = config.file_tx_limit_mib.max(MIN_LIMIT_MIB) * MIB;
        let target_name = path.display().to_string();

        info!("Opened file sink {} (limit {} bytes)", target_name, limit);
        Ok(Self {
            file: Some(file),
            target_name,
            buf: BytesMut::with_capacity(capacity),
            capacity,
            position: 0,
            limit,
            shaper: RateShaper::new(),
        })
    }

    /// Sets the output bitrate in bits per second; `None` writes unpaced.
    pub fn set_bitrate(&mut self, bitrate: Option<NonZeroU32>) {
        self.shaper.set_bitrate(bitrate);
    }

    /// Current output bitrate, `None` when unpaced.
    pub fn bitrate(&self) -> Option<NonZeroU32> {
        self.shaper.bitrate()
    }

    /// Sets the wrap-around limit in MiB. Values below [`MIN_LIMIT_MIB`] are raised to it.
    pub fn set_limit_mib(&mut self, mib: u64) -> Result<()> {
        if mib < 1 {
            return Err(TsioError::InvalidArgument(format!("Bad limit value: {}", mib)));
        }
        self.limit = mib.max(MIN_LIMIT_MIB).saturating_mul(MIB);
        Ok(())
    }

    /// Size limit in bytes
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Offset the next buffer will be written at
    pub fn position(&self) -> u64 {
        self.position
    }

    fn flush_buffer(&mut self, paced: bool) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let file = self.file.as_mut().ok_or(TsioError::Closed)?;

        let len = self.buf.len() as u64;
        if self.position > 0 && self.position + len > self.limit {
            debug!("{} reached limit at {}, wrapping", self.target_name, self.position);
            file.seek(SeekFrom::Start(0))?;
            self.position = 0;
        }

        file.write_all(&self.buf)?;
        self.position += len;
        self.buf.clear();

        if paced {
            self.shaper.pace(len as usize);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_buffer(false)?;
        if let Some(file) = self.file.as_mut() {
            file.set_len(self.position)?;
            file.flush()?;
        }
        Ok(())
    }
}

impl TxChannel for FileTxChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.file.is_none() {
            return Err(TsioError::Closed);
        }
        check_packet_aligned(data.len())?;

        let mut rest = data;
        while !rest.is_empty() {
            let n = (self.capacity - self.buf.len()).min(rest.len());
            self.buf.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
            if self.buf.len() == self.capacity {
                self.flush_buffer(true)?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        let result = self.finish();
        self.file = None;
        info!("Closed file sink {} at {} bytes", self.target_name, self.position);
        result
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl Queryable for FileTxChannel {
    fn properties(&self) -> &'static [Property] {
        &[Property::Bitrate, Property::Limit]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::Bitrate => Some(Value::Long(
                self.bitrate().map_or(-1, |b| b.get() as i64),
            )),
            Property::Limit => Some(Value::Long(self.limit as i64)),
            _ => None,
        }
    }
}

impl Controllable for FileTxChannel {
    fn commands(&self) -> &'static [Command] {
        &[Command::Bitrate, Command::Limit]
    }

    fn control(&mut self, command: Command, args: &[Value]) -> Result<()> {
        match command {
            Command::Bitrate => {
                let bitrate = bitrate_arg(single_arg(command, args)?)?;
                self.set_bitrate(bitrate);
                Ok(())
            }
            Command::Limit => {
                let mib = single_arg(command, args)?.as_i64()?;
                if mib < 1 {
                    return Err(TsioError::InvalidArgument(format!("Bad limit value: {}", mib)));
                }
                self.set_limit_mib(mib as u64)
            }
            other => Err(TsioError::UnsupportedCommand(other.key().to_string())),
        }
    }
}

impl Drop for FileTxChannel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close file sink {}: {}", self.target_name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::{null_packet, SYNC_BYTE};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tsio-tx-{}-{}.ts", tag, std::process::id()))
    }

    fn packets(count: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(count * TS_PACKET_SIZE);
        for i in 0..count {
            data.push(SYNC_BYTE);
            data.extend(std::iter::repeat(i as u8).take(TS_PACKET_SIZE - 1));
        }
        data
    }

    #[test]
    fn test_write_flushes_full_buffers_and_close_flushes_rest() {
        let path = temp_path("flush");
        let mut channel = FileTxChannel::open(&path).unwrap();
        let data = packets(FILE_BUFFER_PACKETS + 3);

        channel.write(&data).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (FILE_BUFFER_PACKETS * TS_PACKET_SIZE) as u64
        );

        channel.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_misaligned_write_is_rejected_without_side_effects() {
        let path = temp_path("misaligned");
        let mut channel = FileTxChannel::open(&path).unwrap();

        let err = channel.write(&[SYNC_BYTE; 100]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(channel.buf.is_empty());

        channel.write(null_packet()).unwrap();
        channel.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), null_packet().to_vec());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_limit_wraps_to_start_and_truncates_on_close() {
        let path = temp_path("wrap");
        let mut channel = FileTxChannel::open(&path).unwrap();
        // Shrink below the public floor to exercise wrapping cheaply.
        channel.limit = (2 * FILE_BUFFER_PACKETS * TS_PACKET_SIZE) as u64;

        let first = packets(2 * FILE_BUFFER_PACKETS);
        channel.write(&first).unwrap();
        assert_eq!(channel.position(), channel.limit);

        let second = packets(3);
        channel.write(&second[..]).unwrap();
        channel.close().unwrap();

        // The tail flush no longer fits, so it overwrote the start and the
        // file was cut at the final position.
        assert_eq!(std::fs::read(&path).unwrap(), second);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_limit_command() {
        let path = temp_path("limit");
        let mut channel = FileTxChannel::open(&path).unwrap();

        channel.control(Command::Limit, &[Value::from(5)]).unwrap();
        assert_eq!(channel.limit(), MIN_LIMIT_MIB * MIB);
        channel.control(Command::Limit, &[Value::from("512")]).unwrap();
        assert_eq!(channel.query(Property::Limit), Some(Value::Long(512 * MIB as i64)));

        assert!(channel.control(Command::Limit, &[0.into()]).unwrap_err().is_invalid_argument());
        assert!(channel.control(Command::Limit, &[]).unwrap_err().is_invalid_argument());
        assert!(channel
            .control(Command::Limit, &["lots".into()])
            .unwrap_err()
            .is_invalid_argument());

        drop(channel);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_bitrate_command() {
        let path = temp_path("bitrate");
        let mut channel = FileTxChannel::open(&path).unwrap();
        assert_eq!(channel.query(Property::Bitrate), Some(Value::Long(-1)));

        channel.control(Command::Bitrate, &[Value::Long(1_000_000)]).unwrap();
        assert_eq!(channel.bitrate(), NonZeroU32::new(1_000_000));
        assert!(channel.control(Command::Bitrate, &[0.into()]).unwrap_err().is_invalid_argument());
        assert_eq!(channel.bitrate(), NonZeroU32::new(1_000_000));

        channel.control(Command::Bitrate, &["-1".into()]).unwrap();
        assert_eq!(channel.bitrate(), None);

        drop(channel);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_bitrate_paces_flushes() {
        let path = temp_path("paced");
        let mut channel = FileTxChannel::open(&path).unwrap();
        // One buffer of 18800 bytes takes 50 ms at this rate.
        let bitrate = (FILE_BUFFER_PACKETS * TS_PACKET_SIZE * 8 * 20) as u32;
        channel.set_bitrate(NonZeroU32::new(bitrate));

        let data = packets(FILE_BUFFER_PACKETS);
        let start = Instant::now();
        for _ in 0..3 {
            channel.write(&data).unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(100));

        // Close flushes without pacing.
        channel.write(&data[..TS_PACKET_SIZE]).unwrap();
        let start = Instant::now();
        channel.close().unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_write_after_close_and_double_close() {
        let path = temp_path("closed");
        let mut channel = FileTxChannel::open(&path).unwrap();
        channel.close().unwrap();
        channel.close().unwrap();
        assert!(channel.is_closed());
        assert!(matches!(channel.write(null_packet()), Err(TsioError::Closed)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_capabilities_are_honored() {
        let path = temp_path("caps");
        let mut channel = FileTxChannel::open(&path).unwrap();
        for &p in channel.properties() {
            assert!(channel.query(p).is_some());
        }
        for &c in channel.commands() {
            assert!(channel.has_command(c));
            channel.control(c, &[Value::from(200)]).unwrap();
        }
        assert!(!channel.has_command(Command::Sync));
        drop(channel);
        let _ = std::fs::remove_file(&path);
    }
}
