use super::{Protocol, PROTOCOL_VERSION};
use crate::capability::{Property, Queryable, Value};
use crate::channel::{RxChannel, TxChannel};
use crate::error::{Result, TsioError};
use std::path::PathBuf;
use url::Url;

mod rx;
mod tx;

pub use rx::FileRxChannel;
pub use tx::{FileTxChannel, FILE_BUFFER_PACKETS, MIN_LIMIT_MIB};

/// Local files, named by OS path or `file:` URI.
///
/// Acceptance is deliberately broad: anything that is not a URI with some
/// other scheme is taken to be a path, and problems surface when opening.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileProtocol;

impl FileProtocol {
    /// Creates the protocol.
    pub fn new() -> Self {
        Self
    }

    /// Maps `resource` to a path, `None` when it is not a file resource.
    fn resolve_path(resource: &str) -> Result<Option<PathBuf>> {
        if resource.trim().is_empty() {
            return Ok(None);
        }

        match Url::parse(resource) {
            Ok(url) if url.scheme() == "file" => url.to_file_path().map(Some).map_err(|_| {
                TsioError::InvalidArgument(format!("Invalid file URI: {}", resource))
            }),
            // Windows drive letters parse as one-letter schemes.
            Ok(url) if url.scheme().len() == 1 => Ok(Some(PathBuf::from(resource))),
            Ok(_) => Ok(None),
            Err(_) => Ok(Some(PathBuf::from(resource))),
        }
    }

    fn path(resource: &str) -> Result<PathBuf> {
        Self::resolve_path(resource)?
            .ok_or_else(|| TsioError::unsupported(resource, "not a file path or file URI"))
    }
}

impl Queryable for FileProtocol {
    fn properties(&self) -> &'static [Property] {
        &[Property::Name, Property::Version]
    }

    fn query(&self, property: Property) -> Option<Value> {
        match property {
            Property::Name => Some("File Protocol".into()),
            Property::Version => Some(PROTOCOL_VERSION.into()),
            _ => None,
        }
    }
}

impl Protocol for FileProtocol {
    fn accepts(&self, resource: &str) -> Result<bool> {
        Ok(Self::resolve_path(resource)?.is_some())
    }

    fn open_rx(&self, resource: &str) -> Result<Box<dyn RxChannel>> {
        Ok(Box::new(FileRxChannel::open(Self::path(resource)?)?))
    }

    fn open_tx(&self, resource: &str) -> Result<Box<dyn TxChannel>> {
        Ok(Box::new(FileTxChannel::open(Self::path(resource)?)?))
    }
}
