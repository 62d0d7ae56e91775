use super::{FileProtocol, MulticastProtocol, Protocol};
use crate::capability::{Property, Value};
use crate::channel::{RxChannel, TxChannel};
use crate::error::{Result, TsioError};
use lazy_static::lazy_static;
use log::{debug, warn};
use parking_lot::RwLock;
use std::sync::Arc;

lazy_static! {
    static ref REGISTRY: RwLock<ProtocolRegistry> = RwLock::new(ProtocolRegistry::with_defaults());
}

/// Ordered set of protocols; the first one that accepts a resource wins.
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    protocols: Vec<Arc<dyn Protocol>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Multicast first, then the file protocol, whose acceptance is broad.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MulticastProtocol::new());
        registry.register(FileProtocol::new());
        registry
    }

    /// Appends `protocol`; it is consulted after every protocol already registered.
    pub fn register<P: Protocol + 'static>(&mut self, protocol: P) {
        self.protocols.push(Arc::new(protocol));
    }

    /// Number of registered protocols.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Whether no protocol is registered.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Registered protocols in consultation order.
    pub fn protocols(&self) -> &[Arc<dyn Protocol>] {
        &self.protocols
    }

    /// Opens a receive channel with the first protocol that accepts `resource`.
    pub fn open_rx(&self, resource: &str) -> Result<Box<dyn RxChannel>> {
        self.dispatch(resource, |protocol| protocol.open_rx(resource))
    }

    /// Opens a transmit channel with the first protocol that accepts `resource`.
    pub fn open_tx(&self, resource: &str) -> Result<Box<dyn TxChannel>> {
        self.dispatch(resource, |protocol| protocol.open_tx(resource))
    }

    /// The protocol that would serve `resource`. Opens nothing.
    pub fn resolve(&self, resource: &str) -> Result<Arc<dyn Protocol>> {
        self.dispatch(resource, |protocol| Ok(Arc::clone(protocol)))
    }

    fn dispatch<T>(
        &self,
        resource: &str,
        mut open: impl FnMut(&Arc<dyn Protocol>) -> Result<T>,
    ) -> Result<T> {
        for protocol in &self.protocols {
            match protocol.accepts(resource) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(
                        "Protocol {} failed to check resource {}: {}",
                        protocol_name(protocol.as_ref()),
                        resource,
                        e
                    );
                    continue;
                }
            }

            match open(protocol) {
                Err(TsioError::UnsupportedResource { reason, .. }) => {
                    debug!(
                        "Protocol {} does not apply to {}: {}",
                        protocol_name(protocol.as_ref()),
                        resource,
                        reason
                    );
                }
                other => return other,
            }
        }

        Err(TsioError::NoMatchingProtocol(resource.to_string()))
    }
}

fn protocol_name(protocol: &dyn Protocol) -> String {
    match protocol.query(Property::Name) {
        Some(Value::Text(name)) => name,
        Some(other) => other.to_string(),
        None => "<unnamed>".to_string(),
    }
}

/// Adds `protocol` to the process-wide registry, after the built-in ones.
pub fn register_protocol<P: Protocol + 'static>(protocol: P) {
    REGISTRY.write().register(protocol);
}

/// Opens a receive channel through the process-wide registry.
pub fn open_rx_channel(resource: &str) -> Result<Box<dyn RxChannel>> {
    REGISTRY.read().open_rx(resource)
}

/// Opens a transmit channel through the process-wide registry.
pub fn open_tx_channel(resource: &str) -> Result<Box<dyn TxChannel>> {
    REGISTRY.read().open_tx(resource)
}

/// Looks up the protocol for `resource` in the process-wide registry.
pub fn resolve_protocol(resource: &str) -> Result<Arc<dyn Protocol>> {
    REGISTRY.read().resolve(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Controllable, Queryable};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullRx;

    impl Queryable for NullRx {}
    impl Controllable for NullRx {}

    impl RxChannel for NullRx {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(TsioError::EndOfStream)
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    enum Behavior {
        Accept,
        Reject,
        FailCheck,
        NotMine,
        Busy,
    }

    struct Mock {
        name: &'static str,
        prefix: &'static str,
        behavior: Behavior,
        opens: Arc<AtomicUsize>,
    }

    impl Mock {
        fn new(name: &'static str, prefix: &'static str, behavior: Behavior) -> (Self, Arc<AtomicUsize>) {
            let opens = Arc::new(AtomicUsize::new(0));
            let mock = Mock {
                name,
                prefix,
                behavior,
                opens: opens.clone(),
            };
            (mock, opens)
        }
    }

    impl Queryable for Mock {
        fn properties(&self) -> &'static [Property] {
            &[Property::Name]
        }

        fn query(&self, property: Property) -> Option<Value> {
            match property {
                Property::Name => Some(self.name.into()),
                _ => None,
            }
        }
    }

    impl Protocol for Mock {
        fn accepts(&self, resource: &str) -> Result<bool> {
            match self.behavior {
                Behavior::Reject => Ok(false),
                Behavior::FailCheck => Err(TsioError::InvalidArgument("broken".into())),
                _ => Ok(resource.starts_with(self.prefix)),
            }
        }

        fn open_rx(&self, resource: &str) -> Result<Box<dyn RxChannel>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::NotMine => Err(TsioError::unsupported(resource, "not mine")),
                Behavior::Busy => Err(TsioError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    "busy",
                ))),
                _ => Ok(Box::new(NullRx)),
            }
        }

        fn open_tx(&self, resource: &str) -> Result<Box<dyn TxChannel>> {
            Err(TsioError::unsupported(resource, "receive only"))
        }
    }

    #[test]
    fn test_first_acceptor_wins_and_others_are_not_opened() {
        let (first, first_opens) = Mock::new("first", "mem:", Behavior::Reject);
        let (second, second_opens) = Mock::new("second", "mem:", Behavior::Accept);
        let (third, third_opens) = Mock::new("third", "mem:", Behavior::Accept);

        let mut registry = ProtocolRegistry::new();
        registry.register(first);
        registry.register(second);
        registry.register(third);

        assert!(registry.open_rx("mem:a").is_ok());
        assert_eq!(first_opens.load(Ordering::SeqCst), 0);
        assert_eq!(second_opens.load(Ordering::SeqCst), 1);
        assert_eq!(third_opens.load(Ordering::SeqCst), 0);

        let resolved = registry.resolve("mem:a").unwrap();
        assert_eq!(resolved.query(Property::Name), Some(Value::from("second")));
        assert_eq!(second_opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_check_is_skipped() {
        let (broken, broken_opens) = Mock::new("broken", "mem:", Behavior::FailCheck);
        let (good, good_opens) = Mock::new("good", "mem:", Behavior::Accept);

        let mut registry = ProtocolRegistry::new();
        registry.register(broken);
        registry.register(good);

        assert!(registry.open_rx("mem:a").is_ok());
        assert_eq!(broken_opens.load(Ordering::SeqCst), 0);
        assert_eq!(good_opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_applicable_falls_through() {
        let (picky, picky_opens) = Mock::new("picky", "mem:", Behavior::NotMine);
        let (good, good_opens) = Mock::new("good", "mem:", Behavior::Accept);

        let mut registry = ProtocolRegistry::new();
        registry.register(picky);
        registry.register(good);

        assert!(registry.open_rx("mem:a").is_ok());
        assert_eq!(picky_opens.load(Ordering::SeqCst), 1);
        assert_eq!(good_opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_propagates_verbatim() {
        let (busy, _) = Mock::new("busy", "mem:", Behavior::Busy);
        let (good, good_opens) = Mock::new("good", "mem:", Behavior::Accept);

        let mut registry = ProtocolRegistry::new();
        registry.register(busy);
        registry.register(good);

        match registry.open_rx("mem:a") {
            Err(TsioError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::AddrInUse),
            other => panic!("expected busy error, got {:?}", other.err()),
        }
        assert_eq!(good_opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_matching_protocol() {
        let (only, _) = Mock::new("only", "mem:", Behavior::Accept);
        let mut registry = ProtocolRegistry::new();
        registry.register(only);

        match registry.open_rx("tape:1") {
            Err(TsioError::NoMatchingProtocol(resource)) => assert_eq!(resource, "tape:1"),
            other => panic!("expected no match, got {:?}", other.err()),
        }
        assert!(matches!(
            registry.open_tx("mem:a"),
            Err(TsioError::NoMatchingProtocol(_))
        ));
        assert!(ProtocolRegistry::new().resolve("mem:a").is_err());
    }

    #[test]
    fn test_defaults_route_by_resource() {
        let registry = ProtocolRegistry::with_defaults();
        assert_eq!(registry.len(), 2);

        let file = registry.resolve("/tmp/capture.ts").unwrap();
        assert_eq!(file.query(Property::Name), Some(Value::from("File Protocol")));

        let multicast = registry.resolve("udp://239.1.1.1:1234").unwrap();
        assert_eq!(multicast.query(Property::Name), Some(Value::from("Multicast Protocol")));

        // A unicast address is neither multicast nor a file path.
        assert!(registry.resolve("udp://10.0.0.1:1234").is_err());
    }
}
