//! Store API adapter - batch persistence boundary
//!
//! The hub calls `save_data` exactly once per completed flush with exactly
//! one batch, oldest entry first. The store side is a black box with an
//! all-or-nothing call contract; the adapter POSTs the batch as a JSON
//! array and treats any non-success status as failure.

use crate::domain::types::ProcessedAgentData;
use crate::infra::config::Config;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Persistence sink for drained batches.
#[async_trait]
pub trait StoreSink: Send + Sync {
    async fn save_data(&self, batch: &[ProcessedAgentData]) -> anyhow::Result<()>;
}

/// HTTP adapter for the Store API.
pub struct StoreApiAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl StoreApiAdapter {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.store_timeout_ms()))
            .http1_only()
            .build()
            .context("Failed to build store api client")?;

        let endpoint = format!(
            "{}/processed_agent_data/",
            config.store_base_url().trim_end_matches('/')
        );

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StoreSink for StoreApiAdapter {
    async fn save_data(&self, batch: &[ProcessedAgentData]) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .context("store api request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("store api returned {}", status);
        }

        debug!(entries = %batch.len(), status = %status.as_u16(), "batch_saved");
        Ok(())
    }
}
