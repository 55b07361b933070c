use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use axie_scout::agent::scheduler::Scheduler;
use axie_scout::builds::FileBuildSource;
use axie_scout::config::{AgentMode, AppConfig};
use axie_scout::genetics::GeneticsClient;
use axie_scout::market::client::MarketplaceClient;
use axie_scout::monitoring::alerts::DiscordNotifier;
use axie_scout::monitoring::logger;

#[derive(Debug, Parser)]
#[command(name = "axie-scout", about = "Axie marketplace listing alerts")]
struct Cli {
    /// Config file path (default: config/default.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Force test mode: alerts go to the test guild's webhook.
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, secrets) = AppConfig::load(cli.config.as_deref())?;
    if cli.test {
        config.agent.mode = AgentMode::Test;
    }

    logger::init_logging(&config.monitoring)?;

    let channel = config.discord.channel_for(config.agent.mode);
    tracing::info!(
        mode = ?config.agent.mode,
        guild_id = channel.guild_id,
        channel_id = channel.channel_id,
        new_listings = config.tasks.new_listings,
        old_listings = config.tasks.old_listings,
        "axie-scout starting"
    );

    let client = Arc::new(MarketplaceClient::new(
        &config.marketplace,
        &config.rate_limit,
    )?);
    let build_source = Arc::new(FileBuildSource::new(&config.builds.path));
    let genetics = Arc::new(GeneticsClient::new(&config.genetics)?);
    let notifier = Arc::new(DiscordNotifier::new(
        secrets.webhook_for(config.agent.mode),
        config.monitoring.alerts_enabled,
        &config.alerts,
    ));

    if !notifier.is_enabled() {
        tracing::warn!("No webhook configured for this mode — alerts will be dropped");
    }

    let scheduler = Arc::new(
        Scheduler::new(config, client, build_source, genetics, notifier).await?,
    );

    scheduler.run().await
}
