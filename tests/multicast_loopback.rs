#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tsio::format::ts::{null_packet, DATAGRAM_SIZE, SYNC_BYTE, TS_PACKET_SIZE};
    use tsio::protocol::multicast::nif;
    use tsio::protocol::{MulticastRxChannel, MulticastTxChannel};
    use tsio::{RxChannel, TsioError, TxChannel};

    fn group() -> SocketAddr {
        let port = 20_000 + (std::process::id() % 20_000) as u16;
        SocketAddr::from(([239, 255, 42, 42], port))
    }

    #[test]
    fn test_tail_datagram_is_padded_on_close() {
        let group = group();
        let interface = match nif::select_for(group.ip()) {
            Ok(interface) => interface,
            Err(TsioError::NoUsableInterface) => {
                eprintln!("No multicast-capable interface, skipping");
                return;
            }
            Err(e) => panic!("interface lookup failed: {}", e),
        };

        let mut rx = MulticastRxChannel::open_on(group, interface.clone()).unwrap();
        rx.set_timeout(Duration::from_secs(2)).unwrap();
        let mut tx = MulticastTxChannel::open_on(group, interface).unwrap();

        let mut data = vec![0x5a; 3 * TS_PACKET_SIZE];
        for packet in data.chunks_mut(TS_PACKET_SIZE) {
            packet[0] = SYNC_BYTE;
        }
        tx.write(&data).unwrap();
        tx.close().unwrap();
        assert_eq!(tx.datagrams_sent(), 1);

        let mut datagram = vec![0u8; DATAGRAM_SIZE];
        match rx.read(&mut datagram) {
            Ok(n) => assert_eq!(n, DATAGRAM_SIZE),
            Err(TsioError::Timeout(_)) => {
                eprintln!("Multicast loopback not routed on this host, skipping");
                return;
            }
            Err(e) => panic!("receive failed: {}", e),
        }

        assert_eq!(&datagram[..data.len()], &data[..]);
        for padding in datagram[data.len()..].chunks(TS_PACKET_SIZE) {
            assert_eq!(padding, &null_packet()[..]);
        }
        rx.close().unwrap();
        rx.close().unwrap();
    }
}
