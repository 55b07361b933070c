//! Genetics-lookup collaborator.
//!
//! Matched listings are enriched with gene detail before notification. The
//! lookup is network-bound and allowed to fail or return partial results;
//! enrichment failure must never drop a true positive, so callers fall back
//! to base listing data.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GeneticsConfig;
use crate::market::models::Listing;

/// Gene detail attached to an enriched listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneSummary {
    /// Gene quality, 0.0..=1.0.
    #[serde(default)]
    pub quality: Option<f64>,
    /// Count of parts whose three genes all share the axie's class.
    #[serde(default)]
    pub purity: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct EnrichedListing {
    pub listing: Listing,
    pub genes: Option<GeneSummary>,
}

impl EnrichedListing {
    /// A listing with no gene detail, used when enrichment is unavailable.
    pub fn base(listing: Listing) -> Self {
        Self {
            listing,
            genes: None,
        }
    }
}

#[async_trait]
pub trait GeneticsLookup: Send + Sync {
    async fn enrich(
        &self,
        listings: &[Listing],
        r1_deviation: u8,
        r2_deviation: u8,
        is_old: bool,
    ) -> Result<Vec<EnrichedListing>>;
}

/// Pairs every listing with its gene record, keeping listings the lookup did
/// not cover. This is what guarantees a partial or empty enrichment response
/// never shrinks the alert set.
pub fn merge_enrichment(
    listings: Vec<Listing>,
    enriched: Vec<EnrichedListing>,
) -> Vec<EnrichedListing> {
    let mut by_id: HashMap<String, Option<GeneSummary>> = enriched
        .into_iter()
        .map(|e| (e.listing.id.clone(), e.genes))
        .collect();

    listings
        .into_iter()
        .map(|listing| {
            let genes = by_id.remove(&listing.id).flatten();
            EnrichedListing { listing, genes }
        })
        .collect()
}

/// HTTP genes API client.
pub struct GeneticsClient {
    http: reqwest::Client,
    api_url: String,
}

/// One record from the genes API. Entries missing an id cannot be paired
/// with a listing and are dropped.
#[derive(Debug, Deserialize)]
struct GeneRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    summary: GeneSummary,
}

impl GeneticsClient {
    pub fn new(config: &GeneticsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeneticsLookup for GeneticsClient {
    async fn enrich(
        &self,
        listings: &[Listing],
        r1_deviation: u8,
        r2_deviation: u8,
        is_old: bool,
    ) -> Result<Vec<EnrichedListing>> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        let url = format!("{}/{}", self.api_url, ids.join(","));

        let response = self
            .http
            .get(&url)
            .query(&[
                ("r1Deviation", r1_deviation.to_string()),
                ("r2Deviation", r2_deviation.to_string()),
                ("old", is_old.to_string()),
            ])
            .send()
            .await
            .context("Genes API request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Genes API returned HTTP {}", response.status());
        }

        let records: Vec<GeneRecord> = response
            .json()
            .await
            .context("Failed to decode genes API response")?;

        debug!(requested = listings.len(), received = records.len(), "Genes fetched");

        let mut by_id: HashMap<String, GeneSummary> = HashMap::new();
        for record in records {
            match record.id {
                Some(id) => {
                    by_id.insert(id, record.summary);
                }
                None => warn!("Genes API record without an id — skipping"),
            }
        }

        Ok(listings
            .iter()
            .map(|listing| EnrichedListing {
                listing: listing.clone(),
                genes: by_id.remove(&listing.id),
            })
            .collect())
    }
}
