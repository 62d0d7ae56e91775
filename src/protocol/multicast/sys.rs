//! Socket plumbing std does not expose: interface enumeration, address reuse
//! before bind, receive buffer sizing and the outgoing multicast interface.

use super::nif::NetworkInterface;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

#[cfg(unix)]
mod imp {
    use super::*;
    use std::ffi::CStr;
    use std::mem;
    use std::net::{IpAddr, Ipv6Addr};
    use std::os::fd::{AsRawFd, FromRawFd, RawFd};

    fn set_option<T>(fd: RawFd, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
        // SAFETY: `value` is a live `T` and the length passed is exactly its size.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                level,
                name,
                (value as *const T).cast::<libc::c_void>(),
                mem::size_of::<T>() as libc::socklen_t,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub(crate) fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
        let domain = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };

        // SAFETY: plain socket(2) call, the result is checked below.
        let fd = unsafe { libc::socket(domain, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `fd` is a freshly created descriptor nobody else owns; the
        // UdpSocket closes it on every path from here on.
        let socket = unsafe { UdpSocket::from_raw_fd(fd) };

        let on: libc::c_int = 1;
        set_option(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &on)?;
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        set_option(fd, libc::SOL_SOCKET, libc::SO_REUSEPORT, &on)?;

        let rc = match addr {
            SocketAddr::V4(a) => {
                // SAFETY: all-zero is a valid sockaddr_in.
                let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
                sin.sin_family = libc::AF_INET as libc::sa_family_t;
                sin.sin_port = a.port().to_be();
                sin.sin_addr.s_addr = u32::from(*a.ip()).to_be();
                // SAFETY: `sin` is a fully initialised sockaddr_in of the length given.
                unsafe {
                    libc::bind(
                        fd,
                        (&sin as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
                        mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                }
            }
            SocketAddr::V6(a) => {
                // SAFETY: all-zero is a valid sockaddr_in6.
                let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
                sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sin6.sin6_port = a.port().to_be();
                sin6.sin6_addr.s6_addr = a.ip().octets();
                sin6.sin6_scope_id = a.scope_id();
                // SAFETY: `sin6` is a fully initialised sockaddr_in6 of the length given.
                unsafe {
                    libc::bind(
                        fd,
                        (&sin6 as *const libc::sockaddr_in6).cast::<libc::sockaddr>(),
                        mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    )
                }
            }
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(socket)
    }

    pub(crate) fn set_receive_buffer(socket: &UdpSocket, bytes: usize) -> io::Result<()> {
        let size = libc::c_int::try_from(bytes).unwrap_or(libc::c_int::MAX);
        set_option(socket.as_raw_fd(), libc::SOL_SOCKET, libc::SO_RCVBUF, &size)
    }

    pub(crate) fn set_multicast_if_v4(socket: &UdpSocket, interface: Ipv4Addr) -> io::Result<()> {
        let addr = libc::in_addr {
            s_addr: u32::from(interface).to_be(),
        };
        set_option(socket.as_raw_fd(), libc::IPPROTO_IP, libc::IP_MULTICAST_IF, &addr)
    }

    pub(crate) fn set_multicast_if_v6(socket: &UdpSocket, index: u32) -> io::Result<()> {
        let index: libc::c_uint = index;
        set_option(socket.as_raw_fd(), libc::IPPROTO_IPV6, libc::IPV6_MULTICAST_IF, &index)
    }

    /// # Safety
    ///
    /// `addr` must be null or point to a valid socket address whose family
    /// field describes its real type.
    unsafe fn sockaddr_ip(addr: *const libc::sockaddr) -> Option<IpAddr> {
        if addr.is_null() {
            return None;
        }
        match (*addr).sa_family as libc::c_int {
            libc::AF_INET => {
                let sin = &*addr.cast::<libc::sockaddr_in>();
                Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
            }
            libc::AF_INET6 => {
                let sin6 = &*addr.cast::<libc::sockaddr_in6>();
                Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
            }
            _ => None,
        }
    }

    pub(crate) fn interfaces() -> io::Result<Vec<NetworkInterface>> {
        let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
        // SAFETY: `head` is a valid out-pointer; the list is released with freeifaddrs below.
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut interfaces: Vec<NetworkInterface> = Vec::new();
        let mut cursor = head;
        while !cursor.is_null() {
            // SAFETY: `cursor` walks the list returned by getifaddrs, alive until freeifaddrs.
            let entry = unsafe { &*cursor };
            cursor = entry.ifa_next;
            if entry.ifa_name.is_null() {
                continue;
            }

            // SAFETY: `ifa_name` is a NUL-terminated string owned by the list.
            let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                .to_string_lossy()
                .into_owned();
            let position = match interfaces.iter().position(|nif| nif.name == name) {
                Some(position) => position,
                None => {
                    let flags = entry.ifa_flags as libc::c_int;
                    // SAFETY: `ifa_name` is a valid C string; 0 means no such interface.
                    let index = unsafe { libc::if_nametoindex(entry.ifa_name) };
                    interfaces.push(NetworkInterface {
                        name,
                        index,
                        up: flags & libc::IFF_UP != 0,
                        loopback: flags & libc::IFF_LOOPBACK != 0,
                        point_to_point: flags & libc::IFF_POINTOPOINT != 0,
                        multicast: flags & libc::IFF_MULTICAST != 0,
                        ipv4: Vec::new(),
                        ipv6: Vec::new(),
                    });
                    interfaces.len() - 1
                }
            };

            // SAFETY: `ifa_addr` is null or a socket address tagged with its family.
            match unsafe { sockaddr_ip(entry.ifa_addr) } {
                Some(IpAddr::V4(addr)) => interfaces[position].ipv4.push(addr),
                Some(IpAddr::V6(addr)) => interfaces[position].ipv6.push(addr),
                None => {}
            }
        }

        // SAFETY: `head` came from a successful getifaddrs and is freed exactly once.
        unsafe { libc::freeifaddrs(head) };
        Ok(interfaces)
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;

    pub(crate) fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
        UdpSocket::bind(addr)
    }

    pub(crate) fn set_receive_buffer(_socket: &UdpSocket, _bytes: usize) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "receive buffer sizing"))
    }

    pub(crate) fn set_multicast_if_v4(_socket: &UdpSocket, _interface: Ipv4Addr) -> io::Result<()> {
        Ok(())
    }

    pub(crate) fn set_multicast_if_v6(_socket: &UdpSocket, _index: u32) -> io::Result<()> {
        Ok(())
    }

    pub(crate) fn interfaces() -> io::Result<Vec<NetworkInterface>> {
        Ok(Vec::new())
    }
}

pub(crate) use imp::*;
