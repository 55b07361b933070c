//! Outbound alert delivery.
//!
//! The notifier is a collaborator behind a trait so the scheduler can be
//! exercised with a recording double. The concrete implementation posts a
//! plain-content message to a Discord webhook; rich embeds and thumbnails
//! are deliberately out of scope.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::config::AlertConfig;
use crate::genetics::GeneSummary;
use crate::market::models::Listing;

/// A single alert ready for delivery.
#[derive(Debug, Clone)]
pub struct ListingAlert {
    /// Build name, or the bargain label for the unconditional rule.
    pub build_name: String,
    pub listing: Listing,
    pub genes: Option<GeneSummary>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &ListingAlert) -> Result<()>;
}

/// Discord webhook notifier.
pub struct DiscordNotifier {
    webhook_url: Option<SecretString>,
    username: String,
    marketplace_base_url: String,
    http: reqwest::Client,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
    username: &'a str,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<SecretString>, enabled: bool, config: &AlertConfig) -> Self {
        Self {
            enabled: enabled && webhook_url.is_some(),
            webhook_url,
            username: config.username.clone(),
            marketplace_base_url: config.marketplace_base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn listing_url(&self, id: &str) -> String {
        format!("{}/{}/", self.marketplace_base_url, id)
    }

    async fn send(&self, content: &str) -> Result<()> {
        if !self.enabled {
            debug!("Alerts disabled — dropping message");
            return Ok(());
        }

        let Some(ref url) = self.webhook_url else {
            return Ok(());
        };

        let payload = DiscordMessage {
            content,
            username: &self.username,
        };

        let response = self
            .http
            .post(url.expose_secret())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Discord webhook returned HTTP {}", response.status());
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, alert: &ListingAlert) -> Result<()> {
        let content = render_alert(alert, &self.listing_url(&alert.listing.id));
        self.send(&content).await
    }
}

/// Plain-text alert body.
pub fn render_alert(alert: &ListingAlert, listing_url: &str) -> String {
    let listing = &alert.listing;

    let mut lines = vec![format!("**{}**", alert.build_name), listing_url.to_string()];

    let price = listing
        .price()
        .map(|p| format!("${p}"))
        .unwrap_or_else(|| "?".to_string());
    let class = listing
        .class
        .map(|c| c.to_string())
        .unwrap_or_else(|| "Egg".to_string());
    lines.push(format!(
        "Price: {price} | Class: {class} | Breeds: {}",
        listing.breed_count
    ));

    if !listing.parts.is_empty() {
        let names: Vec<&str> = listing.parts.iter().map(|p| p.name.as_str()).collect();
        lines.push(format!("Parts: {}", names.join(", ")));
    }

    if let Some(stats) = listing.stats {
        lines.push(format!(
            "HP {} | Speed {} | Skill {} | Morale {}",
            stats.hp, stats.speed, stats.skill, stats.morale
        ));
    }

    if let Some(ref genes) = alert.genes {
        let quality = genes
            .quality
            .map(|q| format!("{:.1}%", q * 100.0))
            .unwrap_or_else(|| "?".to_string());
        let purity = genes
            .purity
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!("Genes: quality {quality}, purity {purity}"));
    }

    if let Some(ref auction) = listing.auction {
        if let (Some(start), Some(end)) = (auction.starting_time(), auction.ending_time()) {
            lines.push(format!(
                "Listed {} -> {}",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M")
            ));
        }
    }

    lines.join("\n")
}
