//! Purchase specifications ("builds") and the catalog that holds them.
//!
//! Builds are immutable once loaded; the catalog is replaced wholesale on
//! every refresh so poll cycles always match against a consistent snapshot.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::market::models::Class;

/// A user-authored purchase filter.
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    /// Label used as the alert title.
    pub name: String,
    /// Acceptable classes.
    pub classes: HashSet<Class>,
    pub max_breed_count: u32,
    /// USD ceiling, exclusive.
    pub max_price: Decimal,
    /// Part names that must all be present on a matching listing.
    #[serde(default)]
    pub parts: HashSet<String>,
    /// Part ids used as the server-side filter in the old-listings sweep.
    #[serde(default)]
    pub part_ids: Vec<String>,
    /// Tolerances forwarded to the genetics-lookup collaborator.
    #[serde(default)]
    pub r1_deviation: u8,
    #[serde(default)]
    pub r2_deviation: u8,
}

/// Where builds come from. Called at startup and on every catalog-refresh
/// tick.
#[async_trait]
pub trait BuildSource: Send + Sync {
    async fn load_builds(&self) -> Result<Vec<Build>>;
}

/// Loads builds from a TOML file with a top-level `[[builds]]` array.
pub struct FileBuildSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BuildsFile {
    #[serde(default)]
    builds: Vec<Build>,
}

impl FileBuildSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BuildSource for FileBuildSource {
    async fn load_builds(&self) -> Result<Vec<Build>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read builds file: {}", self.path.display()))?;

        let file: BuildsFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        Ok(file.builds)
    }
}

/// Atomic snapshot-swap holder for the current build set. Readers take a
/// cheap `Arc` snapshot at cycle start; a concurrent refresh never tears a
/// running match.
pub struct BuildCatalog {
    inner: RwLock<Arc<Vec<Build>>>,
}

impl BuildCatalog {
    pub fn new(builds: Vec<Build>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(builds)),
        }
    }

    pub async fn snapshot(&self) -> Arc<Vec<Build>> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, builds: Vec<Build>) {
        *self.inner.write().await = Arc::new(builds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BUILDS_TOML: &str = r#"
        [[builds]]
        name = "Terminator"
        classes = ["Reptile", "Dusk"]
        max_breed_count = 1
        max_price = "350"
        parts = ["Tiny Turtle", "Thorny Caterpillar"]
        part_ids = ["horn-tiny-turtle", "tail-thorny-caterpillar"]
        r1_deviation = 0
        r2_deviation = 2

        [[builds]]
        name = "Budget Plant"
        classes = ["Plant"]
        max_breed_count = 0
        max_price = "60"
    "#;

    #[test]
    fn test_parse_builds_file() {
        let file: BuildsFile = toml::from_str(BUILDS_TOML).unwrap();
        assert_eq!(file.builds.len(), 2);

        let terminator = &file.builds[0];
        assert_eq!(terminator.name, "Terminator");
        assert!(terminator.classes.contains(&Class::Dusk));
        assert_eq!(terminator.max_price, dec!(350));
        assert!(terminator.parts.contains("Tiny Turtle"));
        assert_eq!(terminator.part_ids.len(), 2);

        let budget = &file.builds[1];
        assert_eq!(budget.max_breed_count, 0);
        assert!(budget.parts.is_empty());
        assert_eq!(budget.r1_deviation, 0);
    }

    #[tokio::test]
    async fn test_catalog_snapshot_survives_replace() {
        let file: BuildsFile = toml::from_str(BUILDS_TOML).unwrap();
        let catalog = BuildCatalog::new(file.builds);

        let before = catalog.snapshot().await;
        assert_eq!(before.len(), 2);

        catalog.replace(Vec::new()).await;

        // The old snapshot is unaffected, new readers see the replacement.
        assert_eq!(before.len(), 2);
        assert!(catalog.snapshot().await.is_empty());
    }
}
