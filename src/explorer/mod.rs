pub mod client;
pub mod limiter;
pub mod source;

#[cfg(test)]
pub mod mock;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{AuditError, VerifiedSource};

pub use client::ExplorerClient;
pub use source::strip_comments;

/// One ERC-20 transfer as listed by the explorer's `tokentx` action.
/// Numeric fields stay as the decimal strings the explorer returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub token_decimal: String,
    #[serde(default)]
    pub time_stamp: String,
}

/// Block-explorer lookups. Every implementation shares one rate limit.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Verified source with multi-file bundles already flattened.
    /// Unverified contracts are `SourceUnavailable`.
    async fn get_source_code(&self, address: Address) -> Result<VerifiedSource, AuditError>;

    /// Raw ABI JSON, `None` when the contract is not verified
    async fn get_abi(&self, address: Address) -> Result<Option<String>, AuditError>;

    async fn get_contract_creator(&self, address: Address) -> Result<Option<Address>, AuditError>;

    /// Transfers of `token` into or out of `holder`
    async fn get_token_transfers(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<Vec<TokenTransfer>, AuditError>;

    /// Verified contract name, `None` for EOAs and unverified contracts
    async fn get_contract_name(&self, address: Address) -> Result<Option<String>, AuditError>;
}
