use super::sys;
use crate::error::{Result, TsioError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A host network interface and the addresses bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkInterface {
    /// OS interface name
    pub name: String,
    /// OS interface index, 0 when unknown
    pub index: u32,
    /// Administratively up
    pub up: bool,
    /// Loopback interface
    pub loopback: bool,
    /// Point-to-point link
    pub point_to_point: bool,
    /// Supports multicast
    pub multicast: bool,
    /// IPv4 addresses, in enumeration order
    pub ipv4: Vec<Ipv4Addr>,
    /// IPv6 addresses, in enumeration order
    pub ipv6: Vec<Ipv6Addr>,
}

impl NetworkInterface {
    /// Alias interfaces such as `eth0:1`
    pub fn is_virtual(&self) -> bool {
        self.name.contains(':')
    }

    /// Up, multicast capable, and not loopback, point-to-point or an alias.
    pub fn is_usable(&self) -> bool {
        self.up && self.multicast && !self.loopback && !self.point_to_point && !self.is_virtual()
    }

    /// First IPv4 address, used as the outgoing interface for v4 groups.
    pub fn ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4.first().copied()
    }

    /// Whether this interface can carry traffic for `group`.
    pub fn supports(&self, group: IpAddr) -> bool {
        match group {
            IpAddr::V4(_) => self.ipv4_addr().is_some(),
            IpAddr::V6(_) => self.index != 0,
        }
    }
}

/// All interfaces of this host, in OS order.
pub fn list() -> Result<Vec<NetworkInterface>> {
    Ok(sys::interfaces()?)
}

/// The first usable interface able to carry `group`.
pub fn select(interfaces: &[NetworkInterface], group: IpAddr) -> Result<NetworkInterface> {
    interfaces
        .iter()
        .find(|nif| nif.is_usable() && nif.supports(group))
        .cloned()
        .ok_or(TsioError::NoUsableInterface)
}

/// Picks the interface used for `group` on this host.
pub fn select_for(group: IpAddr) -> Result<NetworkInterface> {
    select(&list()?, group)
}
