use chrono::DateTime;
use chrono::Utc;
use clap::Parser;
use mixpanel::types::OP_SET;
use mixpanel::types::OP_UNION;
use mixpanel::Mixpanel;
use mixpanel::Update;
use serde_json::Value;
use tracing::info;

use crate::command::properties;
use crate::command::timestamp;
use crate::error::Result;
use crate::parse_property;
use crate::parse_time;

#[derive(Parser, Clone, Debug)]
pub struct UpdateArgs {
    /// Profile operation, e.g. $set, $set_once or $union
    #[arg(long, default_value = OP_SET)]
    pub operation: String,
    #[arg(long = "prop", value_parser = parse_property)]
    pub props: Vec<(String, Value)>,
    #[arg(long, default_value = "")]
    pub ip: String,
    #[arg(long, value_parser = parse_time, conflicts_with_all = ["now", "ignore_time"])]
    pub time: Option<DateTime<Utc>>,
    #[arg(long, conflicts_with = "ignore_time")]
    pub now: bool,
    /// Leave the profile's last-seen time untouched
    #[arg(long)]
    pub ignore_time: bool,
}

impl UpdateArgs {
    fn to_update(&self) -> Update {
        Update::new(self.operation.as_str())
            .ip(self.ip.as_str())
            .timestamp(timestamp(self.time, self.now, self.ignore_time))
            .properties(properties(&self.props))
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ProfileArgs {
    pub distinct_id: String,
    #[clap(flatten)]
    pub update: UpdateArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct GroupArgs {
    pub group_key: String,
    pub group_id: String,
    #[clap(flatten)]
    pub update: UpdateArgs,
}

pub async fn engage(mp: &dyn Mixpanel, args: &ProfileArgs) -> Result<()> {
    let update = args.update.to_update();
    if update.operation == OP_UNION {
        mp.union_user(&args.distinct_id, &update).await?;
    } else {
        mp.update_user(&args.distinct_id, &update).await?;
    }
    info!(
        distinct_id = %args.distinct_id,
        operation = %update.operation,
        "profile updated"
    );

    Ok(())
}

pub async fn group(mp: &dyn Mixpanel, args: &GroupArgs) -> Result<()> {
    let update = args.update.to_update();
    if update.operation == OP_UNION {
        mp.union_group(&args.group_key, &args.group_id, &update)
            .await?;
    } else {
        mp.update_group(&args.group_key, &args.group_id, &update)
            .await?;
    }
    info!(
        group_key = %args.group_key,
        group_id = %args.group_id,
        operation = %update.operation,
        "group updated"
    );

    Ok(())
}
