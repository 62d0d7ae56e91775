use crate::capability::{single_arg, Command, Controllable, Property, Queryable, Value};
use crate::channel::RxChannel;
use crate::error::{Result, TsioError};
use crate::format::ts::{SyncScanner, SYNC_BYTE, SYNC_RUN, TS_PACKET_SIZE};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Reads a TS file from start to end, optionally looping.
///
/// With rewind enabled an exhausted file is reopened at offset 0 and the
/// read retried once, so a looping source never reports end of stream
/// unless the file is empty.
pub struct FileRxChannel {
    file: Option<BufReader<File>>,
    source_name: String,
    rewind: bool,
}

impl FileRxChannel {
    /// Opens `path` for reading with rewind disabled.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let source_name = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();

        info!("Opened file source {}", source_name);
        Ok(Self {
            file: Some(BufReader::new(file)),
            source_name,
            rewind: false,
        })
    }

    /// Absolute path of the file being read
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Whether reads loop back to the start at end of file.
    pub fn rewind_enabled(&self) -> bool {
        self.rewind
    }

    /// Enables or disables rewind-on-EOF.
    pub fn set_rewind(&mut self, enabled: bool) {
        self.rewind = enabled;
    }

    /// Skips forward until five sync bytes one packet apart have been seen,
    /// leaving the cursor at the packet boundary after the fifth.
    ///
    /// Hitting the end of the file fails with [`TsioError::EndOfStream`]
    /// unless rewind is enabled. With rewind the scan continues from offset 0
    /// and the run carries over the wrap, so a looping file shorter than five
    /// packets still syncs. It fails with [`TsioError::SyncLost`] when a whole
    /// pass holds no sync byte, or when one more pass plus five packets after
    /// the first wrap still has not produced a run.
    pub fn sync(&mut self) -> Result<()> {
        let rewind = self.rewind;
        let file = self.file.as_mut().ok_or(TsioError::Closed)?;
        let len = file.get_ref().metadata()?.len();
        let mut pos = file.stream_position()?;

        let mut scanner = SyncScanner::new();
        let mut found = false;
        let mut seen_sync = false;
        let mut since_wrap: Option<u64> = None;
        let budget = len + (SYNC_RUN * TS_PACKET_SIZE) as u64;

        loop {
            let skip = scanner.pending_skip() as u64;
            if found && skip == 0 {
                debug!("Synced {} at offset {}", self.source_name, pos);
                return Ok(());
            }

            if pos >= len {
                if !rewind {
                    return Err(TsioError::EndOfStream);
                }
                if since_wrap.is_some() && !seen_sync {
                    return Err(TsioError::SyncLost);
                }
                debug!("Sync scan of {} wrapped to start", self.source_name);
                file.seek(SeekFrom::Start(0))?;
                pos = 0;
                since_wrap.get_or_insert(0);
                continue;
            }
            if since_wrap.map_or(false, |n| n > budget) {
                return Err(TsioError::SyncLost);
            }

            let step = if skip > 0 {
                let n = skip.min(len - pos);
                file.seek_relative(n as i64)?;
                scanner.skipped(n as usize);
                n
            } else {
                match next_byte(file)? {
                    Some(byte) => {
                        seen_sync |= byte == SYNC_BYTE;
                        found = scanner.push(byte);
                        1
                    }
                    // The file shrank under us; treat it as the end.
                    None => {
                        pos = len;
                        continue;
                    }
                }
            };
            pos += step;
            if let Some(n) = since_wrap.as_mut() {
                *n += step;
            }
        }
    }
}

fn next_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return Ok(other?),
        }
    }
}

impl RxChannel for FileRxChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let rewind = self.rewind;
        let file = self.file.as_mut().ok_or(TsioError::Closed)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let n = read_retrying(file, buf)?;
        if n > 0 {
            return Ok(n);
        }
        if !rewind {
            return Err(TsioError::EndOfStream);
        }

        debug!("Rewinding {}", self.source_name);
        file.seek(SeekFrom::Start(0))?;
        match read_retrying(file, buf)? {
            0 => Err(TsioError::EndOfStream),
            n => Ok(n),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            info!("Closed file source {}", self.source_name);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl Queryable for FileRxChannel {
    fn properties(&self) -> &'static [Property] {
        &[Property::SourceName]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::SourceName => Some(self.source_name.clone().into()),
            _ => None,
        }
    }
}

impl Controllable for FileRxChannel {
    fn commands(&self) -> &'static [Command] {
        &[Command::Sync, Command::Rewind]
    }

    fn control(&mut self, command: Command, args: &[Value]) -> Result<()> {
        match command {
            Command::Sync => self.sync(),
            Command::Rewind => {
                let enabled = single_arg(command, args)?.as_bool()?;
                self.set_rewind(enabled);
                Ok(())
            }
            other => Err(TsioError::UnsupportedCommand(other.key().to_string())),
        }
    }
}

impl Drop for FileRxChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
