//! The four periodic tasks and the fetch → match → enrich → notify →
//! mark-notified pipeline.
//!
//! Each task is an independent tokio loop. A cycle body returns `Result` and
//! the task catches and logs it, so one bad cycle never kills a task and a
//! failing task never touches the others. There is no retry or backoff: the
//! poll interval itself is the retry delay.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::builds::{Build, BuildCatalog, BuildSource};
use crate::config::AppConfig;
use crate::dedup::DedupTracker;
use crate::genetics::{self, EnrichedListing, GeneticsLookup};
use crate::market::client::MarketplaceClient;
use crate::market::models::Listing;
use crate::matcher;
use crate::monitoring::alerts::{ListingAlert, Notifier};

pub struct Scheduler {
    config: AppConfig,
    client: Arc<MarketplaceClient>,
    catalog: Arc<BuildCatalog>,
    dedup: Arc<Mutex<DedupTracker>>,
    build_source: Arc<dyn BuildSource>,
    genetics: Arc<dyn GeneticsLookup>,
    notifier: Arc<dyn Notifier>,
}

impl Scheduler {
    /// Loads the initial catalog and wires up the shared state. The catalog
    /// and dedup tracker are owned here and reached only through their own
    /// types, never as globals.
    pub async fn new(
        config: AppConfig,
        client: Arc<MarketplaceClient>,
        build_source: Arc<dyn BuildSource>,
        genetics: Arc<dyn GeneticsLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let builds = build_source.load_builds().await?;
        info!(builds = builds.len(), "Build catalog loaded");

        let dedup = DedupTracker::new(config.alerts.dedup_policy);

        Ok(Self {
            config,
            client,
            catalog: Arc::new(BuildCatalog::new(builds)),
            dedup: Arc::new(Mutex::new(dedup)),
            build_source,
            genetics,
            notifier,
        })
    }

    /// Spawns the enabled tasks and runs until an interrupt. In-flight
    /// cycles are abandoned on shutdown, not resumed.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let toggles = &self.config.tasks;
        let intervals = &self.config.scheduler;
        let mut handles = Vec::new();

        if toggles.new_listings {
            let s = self.clone();
            let period = Duration::from_secs(intervals.new_listings_interval_secs);
            handles.push(tokio::spawn(s.new_listings_task(period)));
        }
        if toggles.old_listings {
            let s = self.clone();
            let period = Duration::from_secs(intervals.old_listings_interval_secs);
            handles.push(tokio::spawn(s.old_listings_task(period)));
        }
        if toggles.catalog_refresh {
            let s = self.clone();
            let period = Duration::from_secs(intervals.catalog_refresh_interval_secs);
            handles.push(tokio::spawn(s.catalog_refresh_task(period)));
        }
        if toggles.dedup_reset {
            let s = self.clone();
            let period = Duration::from_secs(intervals.dedup_reset_interval_secs);
            handles.push(tokio::spawn(s.dedup_reset_task(period)));
        }

        info!(tasks = handles.len(), "Scheduler running");

        tokio::signal::ctrl_c().await?;
        info!("Interrupt received — shutting down");

        for handle in &handles {
            handle.abort();
        }

        Ok(())
    }

    // === Task loops ===

    async fn new_listings_task(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.new_listings_cycle().await {
                error!(error = %e, "New-listings cycle failed");
            }
        }
    }

    async fn old_listings_task(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.old_listings_cycle().await {
                error!(error = %e, "Old-listings cycle failed");
            }
        }
    }

    async fn catalog_refresh_task(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The catalog was loaded at startup; skip the immediate tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_catalog_cycle().await {
                error!(error = %e, "Catalog refresh failed — keeping current builds");
            }
        }
    }

    async fn dedup_reset_task(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.dedup_reset_cycle().await;
        }
    }

    // === Cycle bodies ===

    /// Fast poll: latest listings against every build plus the bargain rule.
    pub async fn new_listings_cycle(&self) -> Result<()> {
        let listings = self.client.fetch_new_listings().await?;
        debug!(count = listings.len(), "New listings fetched");

        let builds = self.catalog.snapshot().await;

        for (build, hits) in matcher::match_builds(&listings, &builds) {
            let hits: Vec<Listing> = hits.into_iter().cloned().collect();
            self.dispatch(&build.name, hits, Some(build), false).await;
        }

        let cheap: Vec<Listing> = matcher::bargains(&listings).into_iter().cloned().collect();
        if !cheap.is_empty() {
            let label = self.config.alerts.bargain_label.clone();
            self.dispatch(&label, cheap, None, false).await;
        }

        Ok(())
    }

    /// Slow sweep: page through older listings per build. A fetch error ends
    /// the whole cycle early (remaining builds wait for the next tick).
    pub async fn old_listings_cycle(&self) -> Result<()> {
        let builds = self.catalog.snapshot().await;

        for build in builds.iter() {
            self.sweep_build(build).await?;
        }

        Ok(())
    }

    /// Pages from offset 0 until a short or empty page of matching listings.
    /// Results come back price-ascending, so once a page holds fewer than
    /// `page_size` listings under the build's ceiling, no later page can.
    async fn sweep_build(&self, build: &Build) -> Result<()> {
        let page_size = self.client.page_size();
        let mut offset = 0u32;

        loop {
            let page = self.client.fetch_old_listings(build, offset).await?;
            let hits: Vec<Listing> = matcher::price_under(&page, build.max_price)
                .into_iter()
                .cloned()
                .collect();

            if hits.is_empty() {
                break;
            }

            let full_page = hits.len() as u32 == page_size;
            self.dispatch(&build.name, hits, Some(build), true).await;

            if full_page {
                offset += page_size;
            } else {
                break;
            }
        }

        Ok(())
    }

    pub async fn refresh_catalog_cycle(&self) -> Result<()> {
        let builds = self.build_source.load_builds().await?;
        info!(builds = builds.len(), "Build catalog refreshed");
        self.catalog.replace(builds).await;
        Ok(())
    }

    pub async fn dedup_reset_cycle(&self) {
        let mut dedup = self.dedup.lock().await;
        let cleared = dedup.len();
        dedup.reset();
        info!(cleared, "Dedup window reset");
    }

    // === Pipeline tail: enrich → notify → mark-notified ===

    /// Delivers alerts for one matched batch. Ids already alerted in this
    /// window are skipped before enrichment is paid for; an id is marked
    /// only after its notification succeeded.
    async fn dispatch(
        &self,
        label: &str,
        listings: Vec<Listing>,
        build: Option<&Build>,
        is_old: bool,
    ) {
        let pending: Vec<Listing> = {
            let dedup = self.dedup.lock().await;
            listings
                .into_iter()
                .filter(|l| dedup.should_notify(&l.id, label))
                .collect()
        };

        if pending.is_empty() {
            return;
        }

        let enriched = self.enrich_or_degrade(label, pending, build, is_old).await;

        for item in enriched {
            let id = item.listing.id.clone();
            let alert = ListingAlert {
                build_name: label.to_string(),
                listing: item.listing,
                genes: item.genes,
            };

            match self.notifier.notify(&alert).await {
                Ok(()) => {
                    self.dedup.lock().await.mark_notified(&id, label);
                    info!(listing = %id, build = label, "Alert sent");
                }
                Err(e) => {
                    warn!(listing = %id, build = label, error = %e, "Alert delivery failed");
                }
            }
        }
    }

    /// Gene lookup for build matches. Bargain alerts skip it, and a failed
    /// or partial lookup degrades to base listing data — an enrichment
    /// outage never drops a true positive.
    async fn enrich_or_degrade(
        &self,
        label: &str,
        pending: Vec<Listing>,
        build: Option<&Build>,
        is_old: bool,
    ) -> Vec<EnrichedListing> {
        let Some(build) = build else {
            return pending.into_iter().map(EnrichedListing::base).collect();
        };

        match self
            .genetics
            .enrich(&pending, build.r1_deviation, build.r2_deviation, is_old)
            .await
        {
            Ok(enriched) => genetics::merge_enrichment(pending, enriched),
            Err(e) => {
                warn!(build = label, error = %e, "Genes lookup failed — alerting with base listing data");
                pending.into_iter().map(EnrichedListing::base).collect()
            }
        }
    }

    pub fn catalog(&self) -> &BuildCatalog {
        &self.catalog
    }

    pub fn dedup(&self) -> &Mutex<DedupTracker> {
        &self.dedup
    }
}
