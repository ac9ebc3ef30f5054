use anyhow::Result;
use async_trait::async_trait;

use crate::models::Fixture;

/// Trait that every fixture data source must implement.
#[async_trait]
pub trait FixtureProvider: Send + Sync {
    /// Return all fixtures currently in play.
    async fn fetch_live(&self) -> Result<Vec<Fixture>>;

    /// Return the next batch of fixtures that have not kicked off yet.
    async fn fetch_scheduled(&self) -> Result<Vec<Fixture>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
