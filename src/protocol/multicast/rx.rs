use super::nif::{self, NetworkInterface};
use super::{join, leave, sys};
use crate::capability::{single_arg, Command, Controllable, Property, Queryable, Value};
use crate::channel::RxChannel;
use crate::config;
use crate::error::{Result, TsioError};
use crate::format::ts::{SyncScanner, MAX_DATAGRAM_SIZE};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// Receives a multicast TS stream.
///
/// Bytes are served from one datagram until it is used up, then the next
/// datagram is received. A single read may span several datagrams and blocks
/// until the whole buffer is filled or the receive timeout expires.
pub struct MulticastRxChannel {
    socket: Option<UdpSocket>,
    group: SocketAddr,
    nif: NetworkInterface,
    timeout: Duration,
    datagram: Box<[u8; MAX_DATAGRAM_SIZE]>,
    len: usize,
    pos: usize,
}

fn read_timeout(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

impl MulticastRxChannel {
    /// Joins `group` on the first usable interface.
    pub fn open(group: SocketAddr) -> Result<Self> {
        let nif = nif::select_for(group.ip())?;
        Self::open_on(group, nif)
    }

    /// Joins `group` on `nif`.
    pub fn open_on(group: SocketAddr, nif: NetworkInterface) -> Result<Self> {
        let config = config::current();
        let local = match group {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, group.port())),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, group.port())),
        };

        let socket = sys::bind_reusable(local)?;
        if let Err(e) = sys::set_receive_buffer(&socket, config.rx_socket_buffer) {
            warn!(
                "Could not set receive buffer of {} bytes for {}: {}",
                config.rx_socket_buffer, group, e
            );
        }
        join(&socket, group.ip(), &nif)?;

        let timeout = Duration::from_millis(config.rx_timeout_ms);
        socket.set_read_timeout(read_timeout(timeout))?;

        info!("Joined {} on {}", group, nif.name);
        Ok(Self {
            socket: Some(socket),
            group,
            nif,
            timeout,
            datagram: Box::new([0; MAX_DATAGRAM_SIZE]),
            len: 0,
            pos: 0,
        })
    }

    /// `udp://<group>:<port>`
    pub fn source_name(&self) -> String {
        format!("udp://{}", self.group)
    }

    /// Interface the group was joined on.
    pub fn interface(&self) -> &NetworkInterface {
        &self.nif
    }

    /// Receive timeout, zero when blocking forever.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the receive timeout; zero blocks forever.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(TsioError::Closed)?;
        socket.set_read_timeout(read_timeout(timeout))?;
        self.timeout = timeout;
        Ok(())
    }

    /// Makes sure unread bytes are buffered, receiving a datagram if needed.
    fn fill(&mut self) -> Result<()> {
        if self.pos < self.len {
            return Ok(());
        }
        let socket = self.socket.as_ref().ok_or(TsioError::Closed)?;
        loop {
            match socket.recv(&mut self.datagram[..]) {
                Ok(n) => {
                    self.len = n;
                    self.pos = 0;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TsioError::Timeout(self.timeout));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Skips forward in the stream until five sync bytes one packet apart
    /// have been seen, leaving the cursor on the packet boundary after the
    /// fifth. Fails with [`TsioError::Timeout`] if the stream dries up.
    pub fn sync(&mut self) -> Result<()> {
        let mut scanner = SyncScanner::new();
        let mut found = false;

        loop {
            let skip = scanner.pending_skip();
            if found && skip == 0 {
                debug!("Synchronized on {}", self.group);
                return Ok(());
            }

            self.fill()?;
            let available = self.len - self.pos;
            if skip > 0 {
                let n = skip.min(available);
                self.pos += n;
                scanner.skipped(n);
            } else if available > 0 {
                let byte = self.datagram[self.pos];
                self.pos += 1;
                found = scanner.push(byte);
            }
        }
    }
}

impl RxChannel for MulticastRxChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.socket.is_none() {
            return Err(TsioError::Closed);
        }

        let mut filled = 0;
        while filled < buf.len() {
            self.fill()?;
            let n = (self.len - self.pos).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.datagram[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(filled)
    }

    fn close(&mut self) -> Result<()> {
        match self.socket.take() {
            Some(socket) => {
                let left = leave(&socket, self.group.ip(), &self.nif);
                drop(socket);
                self.len = 0;
                self.pos = 0;
                info!("Left {} on {}", self.group, self.nif.name);
                left
            }
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Queryable for MulticastRxChannel {
    fn properties(&self) -> &'static [Property] {
        &[Property::SourceName, Property::Timeout, Property::NetworkInterface]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::SourceName => Some(self.source_name().into()),
            Property::Timeout => Some(Value::Long(
                i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX),
            )),
            Property::NetworkInterface => Some(self.nif.name.clone().into()),
            _ => None,
        }
    }
}

impl Controllable for MulticastRxChannel {
    fn commands(&self) -> &'static [Command] {
        &[Command::Sync, Command::Timeout]
    }

    fn control(&mut self, command: Command, args: &[Value]) -> Result<()> {
        match command {
            Command::Sync => self.sync(),
            Command::Timeout => {
                let millis = single_arg(command, args)?.as_i64()?;
                let millis = u64::try_from(millis).map_err(|_| {
                    TsioError::InvalidArgument(format!("Invalid timeout: {}", millis))
                })?;
                self.set_timeout(Duration::from_millis(millis))
            }
            other => Err(TsioError::UnsupportedCommand(other.to_string())),
        }
    }
}

impl Drop for MulticastRxChannel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error leaving {}: {}", self.group, e);
        }
    }
}
