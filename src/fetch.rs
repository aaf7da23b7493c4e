//! Page fetching seam for the enrichment pass.
//!
//! A single trait keeps the network edge swappable: the real implementation
//! is a plain `reqwest` GET with a timeout and the configured User-Agent,
//! tests substitute a canned stub. Retry/backoff stays with the scrapers
//! that produced the input files; one failed fetch is one empty description.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EnrichConfig;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body. A non-2xx status is an error, like any transport
    /// failure; callers degrade either one to an empty description.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &EnrichConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("GET {} returned {}", url, status);
        }
        Ok(response.text().await?)
    }
}
