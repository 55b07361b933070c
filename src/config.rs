use std::path::Path;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

use crate::dedup::DedupPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub tasks: TaskToggles,
    pub scheduler: SchedulerConfig,
    pub marketplace: MarketplaceConfig,
    pub rate_limit: RateLimitConfig,
    pub genetics: GeneticsConfig,
    pub builds: BuildsConfig,
    pub alerts: AlertConfig,
    pub discord: DiscordConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Test,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub mode: AgentMode,
}

/// Per-task enable switches. A disabled task is never spawned.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskToggles {
    pub new_listings: bool,
    pub old_listings: bool,
    pub catalog_refresh: bool,
    pub dedup_reset: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub new_listings_interval_secs: u64,
    pub old_listings_interval_secs: u64,
    pub catalog_refresh_interval_secs: u64,
    pub dedup_reset_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    pub graphql_url: String,
    /// Page size for the old-listings sweep. The marketplace caps this at 100.
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneticsConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildsConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Alert title used for the unconditional under-threshold rule.
    pub bargain_label: String,
    pub dedup_policy: DedupPolicy,
    pub marketplace_base_url: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub production: ChannelConfig,
    pub test: ChannelConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChannelConfig {
    pub guild_id: u64,
    pub channel_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub alerts_enabled: bool,
}

impl DiscordConfig {
    pub fn channel_for(&self, mode: AgentMode) -> ChannelConfig {
        match mode {
            AgentMode::Production => self.production,
            AgentMode::Test => self.test,
        }
    }
}

/// Secrets loaded exclusively from environment variables.
/// Not serializable, not stored in config files.
pub struct Secrets {
    pub discord_webhook_url: Option<SecretString>,
    pub discord_test_webhook_url: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            discord_webhook_url: std::env::var("DISCORD_WEBHOOK_URL").ok().map(Into::into),
            discord_test_webhook_url: std::env::var("DISCORD_TEST_WEBHOOK_URL")
                .ok()
                .map(Into::into),
        }
    }

    /// Webhook matching the agent mode, so a test run can never post to the
    /// production channel.
    pub fn webhook_for(&self, mode: AgentMode) -> Option<SecretString> {
        match mode {
            AgentMode::Production => self.discord_webhook_url.clone(),
            AgentMode::Test => self.discord_test_webhook_url.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file (default `config/default.toml`),
    /// overlaying environment variables for secrets.
    pub fn load(path: Option<&Path>) -> Result<(Self, Secrets)> {
        dotenvy::dotenv().ok();

        let config_path = path.unwrap_or_else(|| Path::new("config/default.toml"));
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let secrets = Secrets::from_env();

        Ok((config, secrets))
    }
}
