//! # Capability Model
//!
//! Protocols and channels advertise what can be inspected ([`Property`]) and
//! what can be changed ([`Command`]) through the [`Queryable`] and
//! [`Controllable`] traits. The names are closed enums, so a typo is a
//! compile error, while [`Property::key`] / [`Command::key`] and `FromStr`
//! keep the textual names available for configuration files and tooling.
//!
//! Whatever an object lists must be honored: a listed property answers
//! `Some(_)` from [`Queryable::query`], and a listed command is accepted by
//! [`Controllable::control`] given well-formed arguments.
//!
//! ```rust
//! use tsio::capability::{Command, Value};
//! use std::str::FromStr;
//!
//! let command = Command::from_str("rewind").unwrap();
//! assert_eq!(command, Command::Rewind);
//! assert_eq!(Value::from("TRUE").as_bool().unwrap(), true);
//! ```

use crate::error::{Result, TsioError};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// A readable attribute of a protocol or channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Human readable protocol name
    Name,
    /// Protocol version
    Version,
    /// Resource the channel reads from
    SourceName,
    /// Receive timeout in milliseconds
    Timeout,
    /// Name of the selected network interface
    NetworkInterface,
    /// Configured output bitrate in bits per second, -1 when unshaped
    Bitrate,
    /// File size limit in bytes
    Limit,
}

impl Property {
    /// Every property, in declaration order.
    pub const ALL: [Property; 7] = [
        Property::Name,
        Property::Version,
        Property::SourceName,
        Property::Timeout,
        Property::NetworkInterface,
        Property::Bitrate,
        Property::Limit,
    ];

    /// Textual name used in configuration and tooling.
    pub fn key(&self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::Version => "version",
            Property::SourceName => "source name",
            Property::Timeout => "timeout",
            Property::NetworkInterface => "nif",
            Property::Bitrate => "bitrate",
            Property::Limit => "limit",
        }
    }
}

impl FromStr for Property {
    type Err = TsioError;

    fn from_str(s: &str) -> Result<Self> {
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.key() == s)
            .ok_or_else(|| TsioError::InvalidArgument(format!("unknown property: {}", s)))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A side-effecting action on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Realign the read cursor on TS packet boundaries
    Sync,
    /// Enable or disable rewind-on-EOF (bool)
    Rewind,
    /// Set the receive timeout in milliseconds (non-negative integer)
    Timeout,
    /// Set the output bitrate in bits per second (integer)
    Bitrate,
    /// Set the file size limit in MiB (integer)
    Limit,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Command; 5] = [
        Command::Sync,
        Command::Rewind,
        Command::Timeout,
        Command::Bitrate,
        Command::Limit,
    ];

    /// Textual name of the command.
    pub fn key(&self) -> &'static str {
        match self {
            Command::Sync => "sync",
            Command::Rewind => "rewind",
            Command::Timeout => "timeout",
            Command::Bitrate => "bitrate",
            Command::Limit => "limit",
        }
    }
}

impl FromStr for Command {
    type Err = TsioError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.key() == s)
            .ok_or_else(|| TsioError::UnsupportedCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Untyped argument or property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean flag
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Free text, parsed on demand
    Text(String),
}

impl Value {
    /// Accepts a native bool or a case-insensitive "true"/"false".
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(TsioError::InvalidArgument(format!(
                "expected a boolean, got {}",
                other
            ))),
        }
    }

    /// Accepts an integer, a long integer, or numeric text.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v as i64),
            Value::Long(v) => Ok(*v),
            Value::Text(s) => Ok(s.trim().parse::<i64>()?),
            Value::Bool(b) => Err(TsioError::InvalidArgument(format!(
                "expected a number, got {}",
                b
            ))),
        }
    }

    /// The text of a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Returns the single argument of `command`, or an invalid-argument error.
pub(crate) fn single_arg(command: Command, args: &[Value]) -> Result<&Value> {
    match args {
        [arg] => Ok(arg),
        [] => Err(TsioError::InvalidArgument(format!(
            "command '{}' requires one argument",
            command
        ))),
        _ => Err(TsioError::InvalidArgument(format!(
            "command '{}' takes one argument, got {}",
            command,
            args.len()
        ))),
    }
}

/// Interprets a bitrate argument: positive sets the rate, negative disables
/// shaping, zero is rejected.
pub(crate) fn bitrate_arg(value: &Value) -> Result<Option<NonZeroU32>> {
    let v = value.as_i64()?;
    if v < 0 {
        return Ok(None);
    }
    u32::try_from(v)
        .ok()
        .and_then(NonZeroU32::new)
        .map(Some)
        .ok_or_else(|| TsioError::InvalidArgument(format!("Invalid bitrate: {}", value)))
}

/// Read-only property access.
pub trait Queryable {
    /// Properties this object answers.
    fn properties(&self) -> &'static [Property] {
        &[]
    }

    /// Whether `property` is listed.
    fn has_property(&self, property: Property) -> bool {
        self.properties().contains(&property)
    }

    /// Current value of `property`, `None` when it is not listed.
    fn query(&self, _property: Property) -> Option<Value> {
        None
    }
}

/// Command invocation.
pub trait Controllable {
    /// Commands this object accepts.
    fn commands(&self) -> &'static [Command] {
        &[]
    }

    /// Whether `command` is listed.
    fn has_command(&self, command: Command) -> bool {
        self.commands().contains(&command)
    }

    /// Runs `command` with `args`. Unlisted commands fail with
    /// [`TsioError::UnsupportedCommand`].
    fn control(&mut self, command: Command, _args: &[Value]) -> Result<()> {
        Err(TsioError::UnsupportedCommand(command.key().to_string()))
    }
}
