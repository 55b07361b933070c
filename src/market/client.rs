//! Marketplace GraphQL client.
//!
//! Issues the two listing queries against the gateway with rate limiting and
//! a request timeout. Failures come back as typed [`MarketError`]s; the
//! scheduler decides what a failed cycle means, the client never panics and
//! never retries (the poll interval is the retry delay).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::builds::Build;
use crate::config::{MarketplaceConfig, RateLimitConfig};
use crate::market::models::Listing;
use crate::market::queries;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("marketplace request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("marketplace returned HTTP {status}")]
    Status { status: reqwest::StatusCode },
    #[error("malformed marketplace response: {0}")]
    Malformed(String),
}

/// Wire envelope: `{"data": {"axies": {"total": n, "results": [...]}}}`.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<AxiesData>,
}

#[derive(Debug, Deserialize)]
struct AxiesData {
    axies: AxiesResults,
}

#[derive(Debug, Deserialize)]
struct AxiesResults {
    /// Results stay raw here so one unexpected object never sinks the batch;
    /// bad entries are dropped with a warning during conversion.
    #[serde(default)]
    results: Vec<Value>,
}

pub struct MarketplaceClient {
    http: reqwest::Client,
    graphql_url: String,
    page_size: u32,
    limiter: Arc<Limiter>,
}

impl MarketplaceClient {
    pub fn new(config: &MarketplaceConfig, rate: &RateLimitConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            graphql_url: config.graphql_url.clone(),
            page_size: config.page_size,
            limiter: create_rate_limiter(rate),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Newest currently listed axies, one fixed-size page.
    #[instrument(skip(self))]
    pub async fn fetch_new_listings(&self) -> Result<Vec<Listing>, MarketError> {
        self.post_query(
            queries::NEW_LISTINGS_QUERY,
            queries::NEW_LISTINGS_OPERATION,
            queries::new_listings_variables(self.page_size),
        )
        .await
    }

    /// One page of the filtered old-listings sweep for a build, starting at
    /// `offset` (a multiple of the page size).
    #[instrument(skip(self, build), fields(build = %build.name, offset))]
    pub async fn fetch_old_listings(
        &self,
        build: &Build,
        offset: u32,
    ) -> Result<Vec<Listing>, MarketError> {
        self.post_query(
            queries::OLD_LISTINGS_QUERY,
            queries::OLD_LISTINGS_OPERATION,
            queries::old_listings_variables(build, offset, self.page_size),
        )
        .await
    }

    async fn post_query(
        &self,
        query: &str,
        operation_name: &str,
        variables: Value,
    ) -> Result<Vec<Listing>, MarketError> {
        self.limiter.until_ready().await;

        let response = self
            .http
            .post(&self.graphql_url)
            .json(&json!({
                "query": query,
                "operationName": operation_name,
                "variables": variables,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::Status {
                status: response.status(),
            });
        }

        let envelope: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Malformed(e.to_string()))?;

        let results = envelope
            .data
            .ok_or_else(|| MarketError::Malformed("response has no data.axies".to_string()))?
            .axies
            .results;

        let listings: Vec<Listing> = results
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Listing>(raw) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable listing");
                    None
                }
            })
            .collect();

        debug!(operation = operation_name, count = listings.len(), "Listings fetched");
        Ok(listings)
    }
}

fn create_rate_limiter(config: &RateLimitConfig) -> Arc<Limiter> {
    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::new(5).unwrap());
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(10).unwrap());

    let quota = Quota::per_second(rps).allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}
