use chrono::DateTime;
use chrono::Utc;
use clap::Parser;
use mixpanel::Event;
use mixpanel::Mixpanel;
use serde_json::Value;
use tracing::info;

use crate::command::properties;
use crate::command::timestamp;
use crate::error::Result;
use crate::parse_property;
use crate::parse_time;

#[derive(Parser, Clone, Debug)]
pub struct EventArgs {
    pub distinct_id: String,
    pub event: String,
    /// Event property as key=value, the value is parsed as JSON when possible
    #[arg(long = "prop", value_parser = parse_property)]
    pub props: Vec<(String, Value)>,
    /// Client IP, "0" disables geolocation
    #[arg(long, default_value = "")]
    pub ip: String,
    /// RFC 3339 or unix seconds
    #[arg(long, value_parser = parse_time, conflicts_with = "now")]
    pub time: Option<DateTime<Utc>>,
    /// Stamp the event with the local clock
    #[arg(long)]
    pub now: bool,
}

impl EventArgs {
    fn to_event(&self) -> Event {
        Event::new()
            .ip(self.ip.as_str())
            .timestamp(timestamp(self.time, self.now, false))
            .properties(properties(&self.props))
    }
}

pub async fn track(mp: &dyn Mixpanel, args: &EventArgs) -> Result<()> {
    mp.track(&args.distinct_id, &args.event, &args.to_event())
        .await?;
    info!(distinct_id = %args.distinct_id, event = %args.event, "tracked");

    Ok(())
}

pub async fn import(mp: &dyn Mixpanel, args: &EventArgs) -> Result<()> {
    mp.import(&args.distinct_id, &args.event, &args.to_event())
        .await?;
    info!(distinct_id = %args.distinct_id, event = %args.event, "imported");

    Ok(())
}
