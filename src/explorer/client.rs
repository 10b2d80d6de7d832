use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::limiter::RateLimiter;
use super::source::normalize_source;
use super::{SourceFetcher, TokenTransfer};
use crate::diagnostics::DiagnosticSink;
use crate::types::{AuditError, VerifiedSource};

/// At most this many explorer requests in flight across the process
pub const MAX_CONCURRENT_REQUESTS: usize = 5;
/// Minimum gap between two request starts
pub const MIN_REQUEST_SPACING: Duration = Duration::from_millis(200);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Etherscan-compatible explorer client (multichain v2 API)
pub struct ExplorerClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    chain_id: u64,
    limiter: RateLimiter,
    diagnostics: DiagnosticSink,
}

/// Every explorer response shares this envelope; `result` is an error string
/// when `status` is "0"
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl Envelope {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }

    fn describe(&self) -> String {
        match self.result.as_str() {
            Some(text) => format!("{}: {}", self.message, text),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ABI", default)]
    abi: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
    #[serde(rename = "CompilerVersion", default)]
    compiler_version: String,
    #[serde(rename = "OptimizationUsed", default)]
    optimization_used: String,
    #[serde(rename = "LicenseType", default)]
    license_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreationEntry {
    contract_creator: String,
}

impl ExplorerClient {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        chain_id: u64,
        diagnostics: DiagnosticSink,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url,
            api_key,
            chain_id,
            limiter: RateLimiter::new(MAX_CONCURRENT_REQUESTS, MIN_REQUEST_SPACING),
            diagnostics,
        }
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    async fn query(
        &self,
        params: &[(&str, String)],
        diagnostic: &str,
    ) -> Result<Envelope, AuditError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AuditError::Explorer("Explorer API key not configured".to_string()))?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| AuditError::Internal(format!("Explorer limiter closed: {}", e)))?;

        let mut query: Vec<(&str, String)> = vec![
            ("chainid", self.chain_id.to_string()),
            ("apikey", api_key.to_string()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Explorer(format!(
                "Explorer request failed: {} - {}",
                status, body
            )));
        }

        let body: serde_json::Value = response.json().await?;
        self.diagnostics.record(diagnostic, &body);

        serde_json::from_value(body)
            .map_err(|e| AuditError::Explorer(format!("Failed to parse explorer response: {}", e)))
    }

    async fn fetch_source_entry(&self, address: Address) -> Result<SourceEntry, AuditError> {
        let envelope = self
            .query(
                &[
                    ("module", "contract".to_string()),
                    ("action", "getsourcecode".to_string()),
                    ("address", address.to_string()),
                ],
                &format!("getsourcecode_{}", address),
            )
            .await?;

        if !envelope.is_ok() {
            return Err(AuditError::Explorer(envelope.describe()));
        }

        let entries: Vec<SourceEntry> = serde_json::from_value(envelope.result).map_err(|e| {
            AuditError::Explorer(format!("Unexpected getsourcecode result: {}", e))
        })?;

        entries.into_iter().next().ok_or_else(|| {
            AuditError::SourceUnavailable(format!("No source record for {}", address))
        })
    }
}

#[async_trait]
impl SourceFetcher for ExplorerClient {
    async fn get_source_code(&self, address: Address) -> Result<VerifiedSource, AuditError> {
        debug!("Fetching verified source for {}", address);

        let entry = self.fetch_source_entry(address).await?;
        if entry.source_code.trim().is_empty() {
            return Err(AuditError::SourceUnavailable(format!(
                "Contract {} is not verified",
                address
            )));
        }

        let source_code = normalize_source(&entry.source_code)?;
        let abi = entry.abi.trim_start().starts_with('[').then_some(entry.abi);

        info!(
            "Fetched source for {} ({}, {} bytes)",
            address,
            entry.contract_name,
            source_code.len()
        );

        Ok(VerifiedSource {
            contract_name: entry.contract_name,
            compiler_version: entry.compiler_version,
            optimization_used: entry.optimization_used,
            license_type: entry.license_type,
            source_code,
            abi,
        })
    }

    async fn get_abi(&self, address: Address) -> Result<Option<String>, AuditError> {
        let envelope = self
            .query(
                &[
                    ("module", "contract".to_string()),
                    ("action", "getabi".to_string()),
                    ("address", address.to_string()),
                ],
                &format!("getabi_{}", address),
            )
            .await?;

        let text = envelope.result.as_str().unwrap_or_default();
        if envelope.is_ok() {
            return Ok(Some(text.to_string()));
        }
        if text.to_ascii_lowercase().contains("not verified") {
            debug!("No verified ABI for {}", address);
            return Ok(None);
        }
        Err(AuditError::Explorer(envelope.describe()))
    }

    async fn get_contract_creator(&self, address: Address) -> Result<Option<Address>, AuditError> {
        let envelope = self
            .query(
                &[
                    ("module", "contract".to_string()),
                    ("action", "getcontractcreation".to_string()),
                    ("contractaddresses", address.to_string()),
                ],
                &format!("getcontractcreation_{}", address),
            )
            .await?;

        if !envelope.is_ok() {
            if envelope.result.is_null() || envelope.result.as_array().is_some_and(|a| a.is_empty())
            {
                return Ok(None);
            }
            return Err(AuditError::Explorer(envelope.describe()));
        }

        let entries: Vec<CreationEntry> = serde_json::from_value(envelope.result).map_err(|e| {
            AuditError::Explorer(format!("Unexpected getcontractcreation result: {}", e))
        })?;

        match entries.first() {
            Some(entry) => entry
                .contract_creator
                .parse::<Address>()
                .map(Some)
                .map_err(|e| AuditError::Explorer(format!("Invalid creator address: {}", e))),
            None => Ok(None),
        }
    }

    async fn get_token_transfers(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<Vec<TokenTransfer>, AuditError> {
        let envelope = self
            .query(
                &[
                    ("module", "account".to_string()),
                    ("action", "tokentx".to_string()),
                    ("contractaddress", token.to_string()),
                    ("address", holder.to_string()),
                    ("startblock", "0".to_string()),
                    ("endblock", "99999999".to_string()),
                    ("sort", "asc".to_string()),
                ],
                &format!("tokentx_{}_{}", token, holder),
            )
            .await?;

        if !envelope.is_ok() {
            if envelope.message.starts_with("No transactions found") {
                return Ok(vec![]);
            }
            return Err(AuditError::Explorer(envelope.describe()));
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| AuditError::Explorer(format!("Unexpected tokentx result: {}", e)))
    }

    async fn get_contract_name(&self, address: Address) -> Result<Option<String>, AuditError> {
        match self.fetch_source_entry(address).await {
            Ok(entry) if !entry.contract_name.is_empty() => Ok(Some(entry.contract_name)),
            Ok(_) => Ok(None),
            Err(AuditError::SourceUnavailable(_)) => Ok(None),
            Err(e) => {
                warn!("Contract name lookup failed for {}: {}", address, e);
                Err(e)
            }
        }
    }
}
