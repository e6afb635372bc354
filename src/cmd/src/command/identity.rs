use clap::Parser;
use mixpanel::Mixpanel;
use tracing::info;

use crate::error::Result;

#[derive(Parser, Clone, Debug)]
pub struct AliasArgs {
    pub distinct_id: String,
    pub new_id: String,
}

#[derive(Parser, Clone, Debug)]
pub struct IdentifyArgs {
    pub identified_id: String,
    /// Anonymous UUID, generated when omitted
    #[arg(long)]
    pub anon_id: Option<String>,
}

pub async fn alias(mp: &dyn Mixpanel, args: &AliasArgs) -> Result<()> {
    mp.alias(&args.distinct_id, &args.new_id).await?;
    info!(
        distinct_id = %args.distinct_id,
        new_id = %args.new_id,
        "alias created"
    );

    Ok(())
}

pub async fn identify(mp: &dyn Mixpanel, args: &IdentifyArgs) -> Result<()> {
    let anon_id = mp
        .identify(&args.identified_id, args.anon_id.as_deref())
        .await?;
    info!(identified_id = %args.identified_id, %anon_id, "identified");
    println!("{anon_id}");

    Ok(())
}
