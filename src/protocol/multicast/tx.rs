use super::nif::{self, NetworkInterface};
use super::{join, leave, sys};
use crate::capability::{bitrate_arg, single_arg, Command, Controllable, Property, Queryable, Value};
use crate::channel::TxChannel;
use crate::config;
use crate::error::{Result, TsioError};
use crate::format::ts::{check_packet_aligned, fill_null_packets, DATAGRAM_SIZE};
use crate::utils::RateShaper;
use bytes::{Buf, BytesMut};
use log::{debug, info, warn};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::num::NonZeroU32;

/// Sends `buf` as datagrams of exactly [`DATAGRAM_SIZE`] bytes, padding the
/// last one with null packets.
///
/// Each datagram's bytes leave `buf` once `send` accepts it, so after an
/// error `buf` holds exactly what was not sent.
fn send_datagrams(
    buf: &mut BytesMut,
    frame: &mut [u8; DATAGRAM_SIZE],
    mut send: impl FnMut(&[u8]) -> io::Result<usize>,
) -> io::Result<()> {
    while !buf.is_empty() {
        let n = buf.len().min(DATAGRAM_SIZE);
        frame[..n].copy_from_slice(&buf[..n]);
        fill_null_packets(&mut frame[n..]);
        let sent = send(&frame[..])?;
        if sent != DATAGRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram: {} of {} bytes", sent, DATAGRAM_SIZE),
            ));
        }
        buf.advance(n);
    }
    Ok(())
}

/// Sends TS packets to a multicast group, seven per datagram.
///
/// Packets are buffered for several datagrams and sent together, paced to
/// the configured bitrate. Closing flushes whatever is buffered, padding the
/// final datagram with null packets.
pub struct MulticastTxChannel {
    socket: Option<UdpSocket>,
    group: SocketAddr,
    nif: NetworkInterface,
    buf: BytesMut,
    capacity: usize,
    frame: Box<[u8; DATAGRAM_SIZE]>,
    shaper: RateShaper,
    datagrams_sent: u64,
}

impl MulticastTxChannel {
    /// Sends to `group` through the first usable interface.
    pub fn open(group: SocketAddr) -> Result<Self> {
        let nif = nif::select_for(group.ip())?;
        Self::open_on(group, nif)
    }

    /// Sends to `group` through `nif`.
    pub fn open_on(group: SocketAddr, nif: NetworkInterface) -> Result<Self> {
        let config = config::current();
        let socket = match group.ip() {
            IpAddr::V4(_) => UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?,
            IpAddr::V6(_) => UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))?,
        };

        join(&socket, group.ip(), &nif)?;
        match group.ip() {
            IpAddr::V4(_) => {
                let interface = nif.ipv4_addr().ok_or(TsioError::NoUsableInterface)?;
                sys::set_multicast_if_v4(&socket, interface)?;
                socket.set_multicast_ttl_v4(config.multicast_ttl)?;
                socket.set_multicast_loop_v4(true)?;
            }
            IpAddr::V6(_) => {
                sys::set_multicast_if_v6(&socket, nif.index)?;
                socket.set_multicast_loop_v6(true)?;
            }
        }

        let capacity = config.multicast_tx_frames.max(1) * DATAGRAM_SIZE;
        info!("Sending to {} on {}", group, nif.name);
        Ok(Self {
            socket: Some(socket),
            group,
            nif,
            buf: BytesMut::with_capacity(capacity),
            capacity,
            frame: Box::new([0; DATAGRAM_SIZE]),
            shaper: RateShaper::new(),
            datagrams_sent: 0,
        })
    }

    /// Sets the output bitrate in bits per second; `None` sends unpaced.
    pub fn set_bitrate(&mut self, bitrate: Option<NonZeroU32>) {
        self.shaper.set_bitrate(bitrate);
    }

    /// Current output bitrate, `None` when unpaced.
    pub fn bitrate(&self) -> Option<NonZeroU32> {
        self.shaper.bitrate()
    }

    /// Interface outgoing datagrams leave on.
    pub fn interface(&self) -> &NetworkInterface {
        &self.nif
    }

    /// Datagrams handed to the socket since open.
    pub fn datagrams_sent(&self) -> u64 {
        self.datagrams_sent
    }

    fn transmit(&mut self, paced: bool) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let socket = self.socket.as_ref().ok_or(TsioError::Closed)?;
        let group = self.group;

        let pending = self.buf.len();
        let result = send_datagrams(&mut self.buf, &mut self.frame, |datagram| {
            socket.send_to(datagram, group)
        });
        let count = (pending - self.buf.len()).div_ceil(DATAGRAM_SIZE);
        self.datagrams_sent += count as u64;
        result?;

        if paced {
            self.shaper.pace(count * DATAGRAM_SIZE);
        }
        Ok(())
    }
}

impl TxChannel for MulticastTxChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.socket.is_none() {
            return Err(TsioError::Closed);
        }
        check_packet_aligned(data.len())?;

        let mut rest = data;
        while !rest.is_empty() {
            let n = (self.capacity - self.buf.len()).min(rest.len());
            self.buf.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
            if self.buf.len() == self.capacity {
                self.transmit(true)?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.socket.is_none() {
            return Ok(());
        }

        self.shaper.set_bitrate(None);
        let flushed = self.transmit(false);

        let left = match self.socket.take() {
            Some(socket) => leave(&socket, self.group.ip(), &self.nif),
            None => Ok(()),
        };
        self.buf.clear();
        debug!("{} datagrams sent to {}", self.datagrams_sent, self.group);
        info!("Closed sender for {}", self.group);
        flushed.and(left)
    }

    fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Queryable for MulticastTxChannel {
    fn properties(&self) -> &'static [Property] {
        &[Property::Bitrate, Property::NetworkInterface]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::Bitrate => Some(Value::Long(
                self.bitrate().map_or(-1, |rate| i64::from(rate.get())),
            )),
            Property::NetworkInterface => Some(self.nif.name.clone().into()),
            _ => None,
        }
    }
}

impl Controllable for MulticastTxChannel {
    fn commands(&self) -> &'static [Command] {
        &[Command::Bitrate]
    }

    fn control(&mut self, command: Command, args: &[Value]) -> Result<()> {
        match command {
            Command::Bitrate => {
                let bitrate = bitrate_arg(single_arg(command, args)?)?;
                self.set_bitrate(bitrate);
                Ok(())
            }
            other => Err(TsioError::UnsupportedCommand(other.to_string())),
        }
    }
}

impl Drop for MulticastTxChannel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing sender for {}: {}", self.group, e);
        }
    }
}
