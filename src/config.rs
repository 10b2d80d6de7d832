use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::chains::{self, DEFAULT_EXPLORER_API_URL};

/// Application configuration
///
/// Chain-specific settings (RPC URLs, explorers) live in chains.rs and are
/// looked up by `chain_id`. This holds process-wide settings only.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub chain_id: u64,
    /// Infura project id, prepended to the RPC list on chains Infura serves
    pub infura_project_id: Option<String>,
    pub explorer_api_url: String,
    pub explorer_api_key: Option<String>,
    pub openai_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Redis for the caches (optional, falls back to in-memory)
    pub redis_url: Option<String>,
    pub report_ttl: Duration,
    pub transfer_ttl: Duration,
    /// Pause between queued audits
    pub queue_interval: Duration,
    /// Raw explorer responses are dumped here when set
    pub diagnostics_dir: Option<PathBuf>,
    /// If set, API requests must carry a matching X-API-Key header
    pub api_key: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let chain_id = parse_or("CHAIN_ID", 1u64)?;
        if chains::get_chain(chain_id).is_none() {
            bail!(
                "Unsupported CHAIN_ID {}. Supported: {:?}",
                chain_id,
                chains::supported_chain_ids()
            );
        }

        let explorer_api_url = non_empty("EXPLORER_API_URL")
            .unwrap_or_else(|| DEFAULT_EXPLORER_API_URL.to_string());
        Url::parse(&explorer_api_url).context("EXPLORER_API_URL is not a valid URL")?;

        let openai_api_url = non_empty("OPENAI_API_URL")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Url::parse(&openai_api_url).context("OPENAI_API_URL is not a valid URL")?;

        Ok(Self {
            port: parse_or("PORT", 3000u16)?,
            chain_id,
            infura_project_id: non_empty("INFURA_PROJECT_ID"),
            explorer_api_url,
            explorer_api_key: non_empty("ETHERSCAN_API_KEY"),
            openai_api_url,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            redis_url: non_empty("REDIS_URL"),
            report_ttl: Duration::from_secs(parse_or("REPORT_TTL_SECS", 24 * 60 * 60)?),
            transfer_ttl: Duration::from_secs(parse_or("TRANSFER_TTL_SECS", 2 * 24 * 60 * 60)?),
            queue_interval: Duration::from_millis(parse_or("QUEUE_INTERVAL_MS", 0)?),
            diagnostics_dir: non_empty("DIAGNOSTICS_DIR").map(PathBuf::from),
            api_key: non_empty("API_KEY"),
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 100u32)?,
            rate_limit_window: Duration::from_secs(parse_or("RATE_LIMIT_WINDOW_SECS", 15 * 60)?),
        })
    }

    /// RPC endpoints for the configured chain, in failover order
    pub fn rpc_urls(&self) -> Vec<String> {
        chains::get_all_rpcs(self.chain_id, self.infura_project_id.as_deref())
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
