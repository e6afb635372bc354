use std::path::PathBuf;

use clap::Parser;
use cmd::command;
use cmd::command::Command;
use cmd::config::Config;
use cmd::config::LogLevel;
use cmd::error::Error;
use cmd::error::Result;
use config::Environment;
use config::File;
use mixpanel::Client;
use mixpanel::Mock;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(propagate_version = true)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a config file, MIXPANEL_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    /// Apply the call to an in-memory mock and print the resulting state
    #[arg(long)]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path.as_path()));
    }

    let cfg = builder
        .add_source(
            Environment::with_prefix("MIXPANEL")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level.unwrap_or(cfg.log.level))
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(Error::SetGlobalDefaultError)?;

    if cli.dry_run {
        debug!("dry run, nothing is sent");
        let mock = Mock::new();
        command::run(&mock, &cli.command).await?;
        print!("{mock}");
        return Ok(());
    }

    let client = Client::new(cfg.try_into()?);
    command::run(&client, &cli.command).await
}
