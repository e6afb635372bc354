use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::MixpanelError;
use crate::error::Result;
use crate::types::Event;
use crate::types::Ip;
use crate::types::Timestamp;
use crate::types::Update;
use crate::types::EVENT_CREATE_ALIAS;
use crate::types::EVENT_IDENTIFY;
use crate::types::OP_UNION;

const RESERVED_EVENT_KEYS: [&str; 2] = ["token", "distinct_id"];
const RESERVED_PROFILE_KEYS: [&str; 7] = [
    "$token",
    "$distinct_id",
    "$group_key",
    "$group_id",
    "$ip",
    "$time",
    "$ignore_time",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Track,
    Import,
    Engage,
    Groups,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Track => "track",
            Endpoint::Import => "import",
            Endpoint::Engage => "engage",
            Endpoint::Groups => "groups",
        }
    }
}

/// Wire-ready call: where it goes, what it carries and whether the service
/// should geolocate the sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub params: Value,
    pub auto_geolocate: bool,
}

/// Profile subject: a user or a group.
enum Subject<'a> {
    User(&'a str),
    Group { key: &'a str, id: &'a str },
}

pub fn parse_anon_id(anon_id: Option<&str>) -> Result<Uuid> {
    match anon_id {
        None => Ok(Uuid::new_v4()),
        Some(id) => Uuid::parse_str(id).map_err(|err| {
            MixpanelError::InvalidArgument(format!("anonymous id {id:?} is not a uuid: {err}"))
        }),
    }
}

/// Turns calls into request parameters. Holds the project token only, no I/O.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    token: String,
}

impl RequestBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn track(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<Request> {
        Ok(self.event(Endpoint::Track, distinct_id, event_name, event))
    }

    pub fn import(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<Request> {
        Ok(self.event(Endpoint::Import, distinct_id, event_name, event))
    }

    /// Links an anonymous id to a known user. Returns the anonymous id that was
    /// sent, generated when none is given.
    pub fn identify(&self, identified_id: &str, anon_id: Option<&str>) -> Result<(Request, Uuid)> {
        if identified_id.is_empty() {
            return Err(MixpanelError::InvalidArgument(
                "identified id must not be empty".to_string(),
            ));
        }
        let anon_id = parse_anon_id(anon_id)?;

        let mut props = self.event_seed(identified_id);
        props.insert("$identified_id".to_string(), identified_id.into());
        props.insert("$anon_id".to_string(), anon_id.to_string().into());

        let req = Request {
            endpoint: Endpoint::Track,
            params: json!({
                "event": EVENT_IDENTIFY,
                "properties": props,
            }),
            auto_geolocate: false,
        };

        Ok((req, anon_id))
    }

    pub fn alias(&self, distinct_id: &str, new_id: &str) -> Result<Request> {
        let mut props = self.event_seed(distinct_id);
        props.insert("alias".to_string(), new_id.into());

        Ok(Request {
            endpoint: Endpoint::Track,
            params: json!({
                "event": EVENT_CREATE_ALIAS,
                "properties": props,
            }),
            auto_geolocate: false,
        })
    }

    pub fn update_user(&self, distinct_id: &str, update: &Update) -> Result<Request> {
        self.profile(
            Endpoint::Engage,
            Subject::User(distinct_id),
            &update.operation,
            update,
        )
    }

    pub fn union_user(&self, distinct_id: &str, update: &Update) -> Result<Request> {
        self.profile(Endpoint::Engage, Subject::User(distinct_id), OP_UNION, update)
    }

    pub fn update_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<Request> {
        self.profile(
            Endpoint::Groups,
            Subject::Group {
                key: group_key,
                id: group_id,
            },
            &update.operation,
            update,
        )
    }

    pub fn union_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<Request> {
        self.profile(
            Endpoint::Groups,
            Subject::Group {
                key: group_key,
                id: group_id,
            },
            OP_UNION,
            update,
        )
    }

    fn event_seed(&self, distinct_id: &str) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("token".to_string(), self.token.as_str().into());
        props.insert("distinct_id".to_string(), distinct_id.into());
        props
    }

    fn event(&self, endpoint: Endpoint, distinct_id: &str, name: &str, event: &Event) -> Request {
        let mut props = self.event_seed(distinct_id);
        if let Some(ip) = event.ip.explicit() {
            props.insert("ip".to_string(), ip.into());
        }
        if let Some(ts) = event.timestamp.resolve() {
            props.insert("time".to_string(), ts.timestamp().into());
        }

        for (key, value) in &event.properties {
            if RESERVED_EVENT_KEYS.contains(&key.as_str()) {
                warn!(key = key.as_str(), event = name, "dropping reserved property supplied by caller");
                continue;
            }
            props.insert(key.to_owned(), value.to_owned());
        }

        Request {
            endpoint,
            params: json!({
                "event": name,
                "properties": props,
            }),
            auto_geolocate: event.ip == Ip::Auto,
        }
    }

    fn profile(
        &self,
        endpoint: Endpoint,
        subject: Subject<'_>,
        operation: &str,
        update: &Update,
    ) -> Result<Request> {
        if operation.is_empty() {
            return Err(MixpanelError::InvalidArgument(
                "update operation must not be empty".to_string(),
            ));
        }
        if RESERVED_PROFILE_KEYS.contains(&operation) {
            return Err(MixpanelError::InvalidArgument(format!(
                "update operation {operation:?} collides with a reserved key"
            )));
        }

        let mut params = Map::new();
        params.insert("$token".to_string(), self.token.as_str().into());
        match subject {
            Subject::User(distinct_id) => {
                params.insert("$distinct_id".to_string(), distinct_id.into());
            }
            Subject::Group { key, id } => {
                params.insert("$group_key".to_string(), key.into());
                params.insert("$group_id".to_string(), id.into());
            }
        }

        if let Some(ip) = update.ip.explicit() {
            params.insert("$ip".to_string(), ip.into());
        }
        match update.timestamp {
            Timestamp::Ignore => {
                params.insert("$ignore_time".to_string(), true.into());
            }
            ts => {
                if let Some(ts) = ts.resolve() {
                    params.insert("$time".to_string(), ts.timestamp().into());
                }
            }
        }

        params.insert(
            operation.to_string(),
            Value::Object(update.properties.clone()),
        );

        Ok(Request {
            endpoint,
            params: Value::Object(params),
            auto_geolocate: update.ip == Ip::Auto,
        })
    }
}
