use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub enrich: EnrichConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// One ingestion source: a JSONL file produced by a scraper. Array order in
/// the config file is the order files are processed in.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub file: PathBuf,
    /// Rank used for best-description selection; smaller wins.
    pub priority: u32,
    /// Whether this source's mentions arrive link-only and should be
    /// picked up by the enrichment pass.
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_workers() -> usize {
    10
}
fn default_delay_ms() -> u64 {
    50
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Config {
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Source names sorted by descending display priority (smallest
    /// `priority` value first). This is the best-description order and is
    /// independent of ingestion (file) order.
    pub fn priority_order(&self) -> Vec<String> {
        let mut ordered: Vec<&SourceConfig> = self.sources.iter().collect();
        ordered.sort_by_key(|s| s.priority);
        ordered.iter().map(|s| s.name.clone()).collect()
    }

    /// Names of sources whose mentions the enrichment pass may touch.
    pub fn enrich_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.enrich)
            .map(|s| s.name.clone())
            .collect()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate sources
    for (i, source) in config.sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            anyhow::bail!("sources[{}].name must not be empty", i);
        }
        if config.sources[..i].iter().any(|s| s.name == source.name) {
            anyhow::bail!("duplicate source name: '{}'", source.name);
        }
        if config.sources[..i]
            .iter()
            .any(|s| s.priority == source.priority)
        {
            anyhow::bail!(
                "duplicate source priority {} ('{}')",
                source.priority,
                source.name
            );
        }
    }

    // Validate enrichment
    if config.enrich.workers == 0 {
        anyhow::bail!("enrich.workers must be >= 1");
    }

    Ok(config)
}
