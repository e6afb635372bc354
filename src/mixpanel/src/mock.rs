//! In-memory stand-in for the ingestion service.
//!
//! [`Mock`] applies calls to a per-subject ledger instead of sending them, so
//! tests can assert on the resulting profile state. Every call either applies
//! completely or leaves the ledger untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::MixpanelError;
use crate::error::Result;
use crate::request::parse_anon_id;
use crate::types::Event;
use crate::types::Ip;
use crate::types::Properties;
use crate::types::Timestamp;
use crate::types::Update;
use crate::types::OP_SET;
use crate::types::OP_SET_ONCE;
use crate::Mixpanel;

#[derive(Debug, Clone, PartialEq)]
pub struct MockEvent {
    pub name: String,
    pub ip: Ip,
    pub timestamp: Timestamp,
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockPeople {
    /// Last address sent with an update, "0" when it was suppressed.
    pub ip: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub properties: Properties,
    pub events: Vec<MockEvent>,
    /// Other ids linked to this subject through alias or identify.
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockGroup {
    pub ip: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub properties: Properties,
}

enum Merge {
    Set,
    SetOnce,
    Union,
}

impl Merge {
    fn from_operation(op: &str) -> Result<Self> {
        match op {
            OP_SET => Ok(Merge::Set),
            OP_SET_ONCE => Ok(Merge::SetOnce),
            other => Err(MixpanelError::UnsupportedOperation(format!(
                "mock only supports the {OP_SET} and {OP_SET_ONCE} operations, got {other:?}"
            ))),
        }
    }

    fn apply(&self, props: &mut Properties, update: &Properties) {
        for (key, value) in update {
            match self {
                Merge::Set => {
                    props.insert(key.to_owned(), value.to_owned());
                }
                Merge::SetOnce => {
                    props
                        .entry(key.to_owned())
                        .or_insert_with(|| value.to_owned());
                }
                Merge::Union => union_into(props, key, value),
            }
        }
    }
}

fn union_into(props: &mut Properties, key: &str, value: &Value) {
    let incoming = match value {
        Value::Array(values) => values.to_owned(),
        v => vec![v.to_owned()],
    };

    let existing = props
        .entry(key.to_owned())
        .or_insert_with(|| Value::Array(vec![]));
    if !existing.is_array() {
        *existing = Value::Array(vec![existing.take()]);
    }
    if let Value::Array(list) = existing {
        for v in incoming {
            if !list.contains(&v) {
                list.push(v);
            }
        }
    }
}

fn apply_profile(
    ip: &mut Option<String>,
    time: &mut Option<DateTime<Utc>>,
    props: &mut Properties,
    merge: Merge,
    update: &Update,
) {
    match &update.ip {
        Ip::Auto => {}
        Ip::Suppress => *ip = Some("0".to_string()),
        Ip::Explicit(addr) => *ip = Some(addr.to_owned()),
    }
    if let Some(ts) = update.timestamp.resolve() {
        *time = Some(ts);
    }
    merge.apply(props, &update.properties);
}

#[derive(Debug, Default)]
pub struct Mock {
    people: DashMap<String, MockPeople>,
    groups: DashMap<(String, String), MockGroup>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a subject's state, creating an empty entry on first use.
    pub fn people(&self, distinct_id: &str) -> MockPeople {
        self.people
            .entry(distinct_id.to_string())
            .or_default()
            .clone()
    }

    pub fn group(&self, group_key: &str, group_id: &str) -> MockGroup {
        self.groups
            .entry((group_key.to_string(), group_id.to_string()))
            .or_default()
            .clone()
    }

    pub fn reset(&self) {
        self.people.clear();
        self.groups.clear();
    }

    fn record(&self, distinct_id: &str, name: &str, event: &Event) {
        let timestamp = match event.timestamp {
            Timestamp::Now => Timestamp::Explicit(Utc::now()),
            ts => ts,
        };
        let mut people = self.people.entry(distinct_id.to_string()).or_default();
        people.events.push(MockEvent {
            name: name.to_string(),
            ip: event.ip.clone(),
            timestamp,
            properties: event.properties.clone(),
        });
    }

    fn apply_user(&self, distinct_id: &str, merge: Merge, update: &Update) {
        let mut people = self.people.entry(distinct_id.to_string()).or_default();
        let people = people.value_mut();
        apply_profile(
            &mut people.ip,
            &mut people.time,
            &mut people.properties,
            merge,
            update,
        );
    }

    fn apply_group(&self, group_key: &str, group_id: &str, merge: Merge, update: &Update) {
        let mut group = self
            .groups
            .entry((group_key.to_string(), group_id.to_string()))
            .or_default();
        let group = group.value_mut();
        apply_profile(
            &mut group.ip,
            &mut group.time,
            &mut group.properties,
            merge,
            update,
        );
    }

    fn link(&self, distinct_id: &str, other_id: String) {
        let mut people = self.people.entry(distinct_id.to_string()).or_default();
        if !people.aliases.contains(&other_id) {
            people.aliases.push(other_id);
        }
    }
}

#[async_trait]
impl Mixpanel for Mock {
    async fn track(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()> {
        self.record(distinct_id, event_name, event);
        Ok(())
    }

    async fn import(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()> {
        self.record(distinct_id, event_name, event);
        Ok(())
    }

    async fn update_user(&self, distinct_id: &str, update: &Update) -> Result<()> {
        let merge = Merge::from_operation(&update.operation)?;
        self.apply_user(distinct_id, merge, update);
        Ok(())
    }

    async fn union_user(&self, distinct_id: &str, update: &Update) -> Result<()> {
        self.apply_user(distinct_id, Merge::Union, update);
        Ok(())
    }

    async fn update_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()> {
        let merge = Merge::from_operation(&update.operation)?;
        self.apply_group(group_key, group_id, merge, update);
        Ok(())
    }

    async fn union_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()> {
        self.apply_group(group_key, group_id, Merge::Union, update);
        Ok(())
    }

    async fn alias(&self, distinct_id: &str, new_id: &str) -> Result<()> {
        self.link(distinct_id, new_id.to_string());
        Ok(())
    }

    async fn identify(&self, identified_id: &str, anon_id: Option<&str>) -> Result<Uuid> {
        if identified_id.is_empty() {
            return Err(MixpanelError::InvalidArgument(
                "identified id must not be empty".to_string(),
            ));
        }
        let anon_id = parse_anon_id(anon_id)?;
        debug!(identified_id, %anon_id, "mock identify");
        self.link(identified_id, anon_id.to_string());
        Ok(anon_id)
    }
}

fn fmt_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}

fn fmt_time(t: &Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn fmt_profile(
    f: &mut Formatter<'_>,
    ip: &Option<String>,
    time: &Option<DateTime<Utc>>,
    props: &Properties,
) -> fmt::Result {
    writeln!(f, "  ip: {}", ip.as_deref().unwrap_or_default())?;
    writeln!(f, "  time: {}", fmt_time(time))?;
    writeln!(f, "  properties:")?;
    for (key, val) in props {
        writeln!(f, "    {}: {}", key, fmt_value(val))?;
    }
    Ok(())
}

impl Display for MockPeople {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_profile(f, &self.ip, &self.time, &self.properties)?;
        if !self.aliases.is_empty() {
            writeln!(f, "  aliases: {}", self.aliases.join(", "))?;
        }
        writeln!(f, "  events:")?;
        for event in &self.events {
            writeln!(f, "    {}:", event.name)?;
            let ip = match &event.ip {
                Ip::Auto => "",
                Ip::Suppress => "0",
                Ip::Explicit(ip) => ip.as_str(),
            };
            writeln!(f, "      IP: {ip}")?;
            let ts = match event.timestamp {
                Timestamp::Explicit(ts) => Some(ts),
                _ => None,
            };
            writeln!(f, "      Timestamp: {}", fmt_time(&ts))?;
            for (key, val) in &event.properties {
                writeln!(f, "      {}: {}", key, fmt_value(val))?;
            }
        }
        Ok(())
    }
}

impl Display for MockGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_profile(f, &self.ip, &self.time, &self.properties)
    }
}

/// Subjects and groups are rendered sorted by id from a snapshot, so the
/// output only changes when the ledger does.
impl Display for Mock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let people = self
            .people
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect::<BTreeMap<_, _>>();
        let groups = self
            .groups
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect::<BTreeMap<_, _>>();

        for (id, p) in &people {
            writeln!(f, "{id}:")?;
            write!(f, "{p}")?;
        }
        for ((key, id), g) in &groups {
            writeln!(f, "group {key}={id}:")?;
            write!(f, "{g}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::types::OP_APPEND;

    #[tokio::test]
    async fn test_track_and_set() {
        let mock = Mock::new();

        mock.update_user("1", &Update::set().property("custom_field", "cool!"))
            .await
            .unwrap();
        mock.track("1", "Sign Up", &Event::new().property("from", "email"))
            .await
            .unwrap();

        assert_eq!(
            mock.to_string(),
            "1:\n  ip: \n  time: \n  properties:\n    custom_field: cool!\n  events:\n    Sign Up:\n      IP: \n      Timestamp: \n      from: email\n"
        );
    }

    #[tokio::test]
    async fn test_import_records_event() {
        let mock = Mock::new();
        let ts = DateTime::from_timestamp(1_000_000_000, 0).unwrap();

        mock.import(
            "7",
            "Purchase",
            &Event::new().ip("1.1.1.1").timestamp(ts).property("sku", 12),
        )
        .await
        .unwrap();

        let p = mock.people("7");
        assert_eq!(p.events.len(), 1);
        assert_eq!(p.events[0].name, "Purchase");
        assert_eq!(p.events[0].ip, Ip::Explicit("1.1.1.1".to_string()));
        assert_eq!(p.events[0].timestamp, Timestamp::Explicit(ts));
        // events do not touch the profile
        assert_eq!(p.ip, None);
        assert_eq!(p.time, None);
    }

    #[tokio::test]
    async fn test_update_ip_and_time() {
        let mock = Mock::new();
        let ts = DateTime::from_timestamp(1_000_000_000, 0).unwrap();

        mock.update_user("1", &Update::set().ip("5.5.5.5").timestamp(ts))
            .await
            .unwrap();
        mock.update_user("1", &Update::set().ip("0").timestamp(Timestamp::Ignore))
            .await
            .unwrap();

        let p = mock.people("1");
        assert_eq!(p.ip.as_deref(), Some("0"));
        assert_eq!(p.time, Some(ts));

        mock.update_user("1", &Update::set().property("k", 1))
            .await
            .unwrap();
        assert_eq!(mock.people("1").ip.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_set_once_keeps_first_value() {
        let mock = Mock::new();

        mock.update_user("1", &Update::set_once().property("plan", "free"))
            .await
            .unwrap();
        mock.update_user("1", &Update::set_once().property("plan", "pro"))
            .await
            .unwrap();
        assert_eq!(mock.people("1").properties["plan"], json!("free"));

        mock.update_user("1", &Update::set().property("plan", "pro"))
            .await
            .unwrap();
        assert_eq!(mock.people("1").properties["plan"], json!("pro"));
    }

    #[tokio::test]
    async fn test_unsupported_operation_leaves_ledger_unchanged() {
        let mock = Mock::new();
        mock.update_user("13793", &Update::set().property("a", 1))
            .await
            .unwrap();
        let before = mock.people("13793");

        let res = mock
            .update_user(
                "13793",
                &Update::new(OP_APPEND)
                    .ip("9.9.9.9")
                    .timestamp(Timestamp::Now)
                    .property("a", 2),
            )
            .await;

        assert!(matches!(res, Err(MixpanelError::UnsupportedOperation(_))));
        assert_eq!(mock.people("13793"), before);
    }

    #[tokio::test]
    async fn test_union_user() {
        let mock = Mock::new();

        mock.update_user("1", &Update::set().property("tags", "a"))
            .await
            .unwrap();
        mock.union_user("1", &Update::new("ignored").property("tags", json!(["a", "b"])))
            .await
            .unwrap();
        mock.union_user("1", &Update::set().property("colors", "red"))
            .await
            .unwrap();

        let p = mock.people("1");
        assert_eq!(p.properties["tags"], json!(["a", "b"]));
        assert_eq!(p.properties["colors"], json!(["red"]));
    }

    #[tokio::test]
    async fn test_groups() {
        let mock = Mock::new();

        mock.update_group("company_id", "11", &Update::set().property("Address", "1313"))
            .await
            .unwrap();
        mock.union_group("company_id", "11", &Update::set().property("tags", "x"))
            .await
            .unwrap();
        let res = mock
            .update_group("company_id", "11", &Update::new("$remove"))
            .await;
        assert!(matches!(res, Err(MixpanelError::UnsupportedOperation(_))));

        let g = mock.group("company_id", "11");
        assert_eq!(g.properties["Address"], json!("1313"));
        assert_eq!(g.properties["tags"], json!(["x"]));
        // groups do not leak into people
        assert!(mock.people.is_empty());
    }

    #[tokio::test]
    async fn test_alias_and_identify() {
        let mock = Mock::new();
        let anon = "3b241101-e2bb-4255-8caf-4136c566a962";

        mock.alias("1", "one").await.unwrap();
        mock.alias("1", "one").await.unwrap();
        let id = mock.identify("1", Some(anon)).await.unwrap();
        assert_eq!(id.to_string(), anon);

        assert_eq!(mock.people("1").aliases, vec!["one".to_string(), anon.to_string()]);
        assert!(matches!(
            mock.identify("1", Some("nope")).await,
            Err(MixpanelError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_render_is_stable() {
        let mock = Mock::new();
        for id in ["b", "a", "c"] {
            mock.track(id, "ev", &Event::new().property("k", id))
                .await
                .unwrap();
        }
        mock.update_group("org", "1", &Update::set().property("n", 1))
            .await
            .unwrap();

        let first = mock.to_string();
        assert_eq!(first, mock.to_string());
        assert!(first.starts_with("a:\n"));
        assert!(first.contains("group org=1:\n"));
    }

    #[tokio::test]
    async fn test_reset() {
        let mock = Mock::new();
        mock.track("1", "ev", &Event::new()).await.unwrap();
        mock.reset();
        assert_eq!(mock.to_string(), "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes() {
        let mock = Arc::new(Mock::new());

        let handles = (0..8)
            .map(|i| {
                let mock = mock.clone();
                tokio::spawn(async move {
                    for j in 0..50 {
                        mock.track("shared", "ev", &Event::new().property("n", j))
                            .await
                            .unwrap();
                        mock.update_user(
                            &format!("user-{i}"),
                            &Update::set().property(format!("k{j}"), j),
                        )
                        .await
                        .unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(mock.people("shared").events.len(), 400);
        for i in 0..8 {
            assert_eq!(mock.people(&format!("user-{i}")).properties.len(), 50);
        }
    }
}
