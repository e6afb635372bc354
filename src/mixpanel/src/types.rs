//! Event and profile update entities.

use chrono::DateTime;
use chrono::Utc;
use serde_json::Map;
use serde_json::Value;

pub type Properties = Map<String, Value>;

pub const OP_SET: &str = "$set";
pub const OP_SET_ONCE: &str = "$set_once";
pub const OP_ADD: &str = "$add";
pub const OP_UNION: &str = "$union";
pub const OP_APPEND: &str = "$append";
pub const OP_REMOVE: &str = "$remove";
pub const OP_UNSET: &str = "$unset";
pub const OP_DELETE: &str = "$delete";

pub const EVENT_CREATE_ALIAS: &str = "$create_alias";
pub const EVENT_IDENTIFY: &str = "$identify";

/// IP address attached to an event or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Ip {
    /// Let the service geolocate the request's origin.
    #[default]
    Auto,
    /// Send no address and disable geolocation.
    Suppress,
    Explicit(String),
}

impl Ip {
    pub fn explicit(&self) -> Option<&str> {
        match self {
            Ip::Explicit(ip) => Some(ip.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Ip {
    fn from(value: &str) -> Self {
        match value {
            "" => Ip::Auto,
            "0" => Ip::Suppress,
            ip => Ip::Explicit(ip.to_string()),
        }
    }
}

impl From<String> for Ip {
    fn from(value: String) -> Self {
        Ip::from(value.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timestamp {
    /// No time is sent, the service uses the time it received the call.
    #[default]
    Unspecified,
    /// Stamped with the local clock when the request is built.
    Now,
    Explicit(DateTime<Utc>),
    /// No time is sent and profile updates ask the service not to touch last-seen.
    Ignore,
}

impl Timestamp {
    /// Resolves the timestamp to the value that goes on the wire, if any.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Now => Some(Utc::now()),
            Timestamp::Explicit(ts) => Some(*ts),
            Timestamp::Unspecified | Timestamp::Ignore => None,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Explicit(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub ip: Ip,
    pub timestamp: Timestamp,
    pub properties: Properties,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ip(mut self, ip: impl Into<Ip>) -> Self {
        self.ip = ip.into();
        self
    }

    pub fn timestamp(mut self, ts: impl Into<Timestamp>) -> Self {
        self.timestamp = ts.into();
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, props: Properties) -> Self {
        self.properties.extend(props);
        self
    }
}

/// Profile update. The operation decides how the service applies the properties
/// ("$set", "$set_once", "$union", ...) and is passed through as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub ip: Ip,
    pub timestamp: Timestamp,
    pub operation: String,
    pub properties: Properties,
}

impl Update {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn set() -> Self {
        Self::new(OP_SET)
    }

    pub fn set_once() -> Self {
        Self::new(OP_SET_ONCE)
    }

    pub fn ip(mut self, ip: impl Into<Ip>) -> Self {
        self.ip = ip.into();
        self
    }

    pub fn timestamp(mut self, ts: impl Into<Timestamp>) -> Self {
        self.timestamp = ts.into();
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, props: Properties) -> Self {
        self.properties.extend(props);
        self
    }
}
