pub mod api_football;
pub mod provider;

pub use api_football::ApiFootball;
pub use provider::FixtureProvider;

use std::sync::Arc;
use tracing::warn;

use crate::models::Fixture;

/// Infallible facade over a [`FixtureProvider`].
///
/// Failures are logged and reported as an empty list. The driver uses the
/// `try_*` variants where it needs to tell "no fixtures" apart from
/// "no answer".
#[derive(Clone)]
pub struct FixtureClient {
    provider: Arc<dyn FixtureProvider>,
}

impl FixtureClient {
    pub fn new(provider: Arc<dyn FixtureProvider>) -> Self {
        FixtureClient { provider }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub async fn try_fetch_live(&self) -> anyhow::Result<Vec<Fixture>> {
        self.provider.fetch_live().await
    }

    pub async fn try_fetch_scheduled(&self) -> anyhow::Result<Vec<Fixture>> {
        self.provider.fetch_scheduled().await
    }

    pub async fn fetch_live(&self) -> Vec<Fixture> {
        self.try_fetch_live().await.unwrap_or_else(|e| {
            warn!("[{}] live fetch failed: {:#}", self.name(), e);
            Vec::new()
        })
    }

    #[allow(dead_code)]
    pub async fn fetch_scheduled(&self) -> Vec<Fixture> {
        self.try_fetch_scheduled().await.unwrap_or_else(|e| {
            warn!("[{}] scheduled fetch failed: {:#}", self.name(), e);
            Vec::new()
        })
    }
}
