//! Alert deduplication.
//!
//! In-memory, best-effort: at most one alert per key within a reset window,
//! nothing survives a restart. The whole set is cleared atomically by the
//! dedup-reset task.

use std::collections::HashSet;

use serde::Deserialize;

/// How alert keys are derived.
///
/// `PerListing` (the default) alerts once per listing id across all builds.
/// `PerListingBuild` alerts once per (listing, build) pair, which can
/// multiply alert volume when builds overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    PerListing,
    PerListingBuild,
}

#[derive(Debug)]
pub struct DedupTracker {
    policy: DedupPolicy,
    seen: HashSet<String>,
}

impl DedupTracker {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
        }
    }

    fn key(&self, listing_id: &str, build_name: &str) -> String {
        match self.policy {
            DedupPolicy::PerListing => listing_id.to_string(),
            DedupPolicy::PerListingBuild => format!("{listing_id}\u{1f}{build_name}"),
        }
    }

    pub fn should_notify(&self, listing_id: &str, build_name: &str) -> bool {
        !self.seen.contains(&self.key(listing_id, build_name))
    }

    /// Idempotent: marking the same key twice is a no-op.
    pub fn mark_notified(&mut self, listing_id: &str, build_name: &str) {
        let key = self.key(listing_id, build_name);
        self.seen.insert(key);
    }

    /// Clears the whole window in one shot.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let mut tracker = DedupTracker::new(DedupPolicy::PerListing);
        assert!(tracker.should_notify("X1", "Terminator"));

        tracker.mark_notified("X1", "Terminator");
        tracker.mark_notified("X1", "Terminator");
        tracker.mark_notified("X1", "Terminator");

        assert!(!tracker.should_notify("X1", "Terminator"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_reset_reopens_every_id() {
        let mut tracker = DedupTracker::new(DedupPolicy::PerListing);
        tracker.mark_notified("X1", "A");
        tracker.mark_notified("X2", "B");
        assert!(!tracker.should_notify("X1", "A"));
        assert!(!tracker.should_notify("X2", "B"));

        tracker.reset();

        assert!(tracker.is_empty());
        assert!(tracker.should_notify("X1", "A"));
        assert!(tracker.should_notify("X2", "B"));
    }

    #[test]
    fn test_per_listing_policy_spans_builds() {
        let mut tracker = DedupTracker::new(DedupPolicy::PerListing);
        tracker.mark_notified("X1", "Terminator");
        // Same listing matched by another build (or the bargain rule): muted.
        assert!(!tracker.should_notify("X1", "Cheap"));
    }

    #[test]
    fn test_per_listing_build_policy_keys_on_pair() {
        let mut tracker = DedupTracker::new(DedupPolicy::PerListingBuild);
        tracker.mark_notified("X1", "Terminator");
        assert!(!tracker.should_notify("X1", "Terminator"));
        assert!(tracker.should_notify("X1", "Cheap"));
        assert!(tracker.should_notify("X2", "Terminator"));
    }
}
