use super::{Protocol, PROTOCOL_VERSION};
use crate::capability::{Property, Queryable, Value};
use crate::channel::{RxChannel, TxChannel};
use crate::error::{Result, TsioError};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use url::{Host, Url};

/// Network interface discovery and selection
pub mod nif;
mod rx;
mod sys;
mod tx;

pub use nif::NetworkInterface;
pub use rx::MulticastRxChannel;
pub use tx::MulticastTxChannel;

/// UDP multicast groups, named `udp://<group>:<port>`.
///
/// The group may be an IPv4 or IPv6 literal or a host name that resolves to
/// a multicast address. The port must be given explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct MulticastProtocol;

impl MulticastProtocol {
    /// Creates the protocol.
    pub fn new() -> Self {
        Self
    }

    /// Group address named by `resource`, `None` when it is not a multicast URI.
    pub fn parse_group(resource: &str) -> Option<SocketAddr> {
        let url = Url::parse(resource).ok()?;
        if url.scheme() != "udp" {
            return None;
        }
        let port = url.port().filter(|&port| port != 0)?;

        let ip = match url.host()? {
            Host::Ipv4(ip) => IpAddr::V4(ip),
            Host::Ipv6(ip) => IpAddr::V6(ip),
            // Non-special schemes leave IPv4 literals as opaque hosts.
            Host::Domain(name) => match name.parse::<IpAddr>() {
                Ok(ip) => ip,
                Err(_) => (name, port).to_socket_addrs().ok()?.next()?.ip(),
            },
        };

        ip.is_multicast().then(|| SocketAddr::new(ip, port))
    }

    fn group(resource: &str) -> Result<SocketAddr> {
        Self::parse_group(resource)
            .ok_or_else(|| TsioError::unsupported(resource, "not a udp multicast URI"))
    }
}

impl Queryable for MulticastProtocol {
    fn properties(&self) -> &'static [Property] {
        &[Property::Name, Property::Version]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::Name => Some("Multicast Protocol".into()),
            Property::Version => Some(PROTOCOL_VERSION.into()),
            _ => None,
        }
    }
}

impl Protocol for MulticastProtocol {
    fn accepts(&self, resource: &str) -> Result<bool> {
        Ok(Self::parse_group(resource).is_some())
    }

    fn open_rx(&self, resource: &str) -> Result<Box<dyn RxChannel>> {
        Ok(Box::new(MulticastRxChannel::open(Self::group(resource)?)?))
    }

    fn open_tx(&self, resource: &str) -> Result<Box<dyn TxChannel>> {
        Ok(Box::new(MulticastTxChannel::open(Self::group(resource)?)?))
    }
}

/// Joins `group` on `nif`.
fn join(socket: &UdpSocket, group: IpAddr, nif: &NetworkInterface) -> Result<()> {
    match group {
        IpAddr::V4(group) => {
            let interface = nif.ipv4_addr().ok_or(TsioError::NoUsableInterface)?;
            socket.join_multicast_v4(&group, &interface)?;
        }
        IpAddr::V6(group) => socket.join_multicast_v6(&group, nif.index)?,
    }
    Ok(())
}

fn leave(socket: &UdpSocket, group: IpAddr, nif: &NetworkInterface) -> Result<()> {
    match group {
        IpAddr::V4(group) => {
            let interface = nif.ipv4_addr().ok_or(TsioError::NoUsableInterface)?;
            socket.leave_multicast_v4(&group, &interface)?;
        }
        IpAddr::V6(group) => socket.leave_multicast_v6(&group, nif.index)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_group() {
        assert_eq!(
            MulticastProtocol::parse_group("udp://239.1.2.3:5000"),
            Some("239.1.2.3:5000".parse().unwrap())
        );
        assert_eq!(
            MulticastProtocol::parse_group("UDP://224.0.0.251:5353"),
            Some("224.0.0.251:5353".parse().unwrap())
        );
        assert_eq!(
            MulticastProtocol::parse_group("udp://[ff15::1]:1234"),
            Some("[ff15::1]:1234".parse().unwrap())
        );
    }

    #[test]
    fn test_rejects_non_multicast_resources() {
        let protocol = MulticastProtocol::new();
        for resource in [
            "udp://10.0.0.1:1234",
            "udp://239.1.2.3",
            "udp://239.1.2.3:0",
            "rtp://239.1.2.3:5000",
            "/tmp/capture.ts",
            "file:///tmp/capture.ts",
            "",
        ] {
            assert!(!protocol.accepts(resource).unwrap(), "{}", resource);
        }
    }

    #[test]
    fn test_open_foreign_resource_does_not_apply() {
        assert!(matches!(
            MulticastProtocol::new().open_tx("/tmp/capture.ts"),
            Err(TsioError::UnsupportedResource { .. })
        ));
    }

    #[test]
    fn test_properties() {
        let protocol = MulticastProtocol::new();
        assert_eq!(
            protocol.query(Property::Name),
            Some(Value::from("Multicast Protocol"))
        );
        assert_eq!(
            protocol.query(Property::Version),
            Some(Value::from(PROTOCOL_VERSION))
        );
        assert!(!protocol.has_property(Property::Bitrate));
    }
}
