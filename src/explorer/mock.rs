//! In-memory `SourceFetcher` for tests

use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{SourceFetcher, TokenTransfer};
use crate::types::{AuditError, VerifiedSource};

/// Unknown addresses are unverified: no source, no ABI, no name.
#[derive(Default)]
pub struct MockExplorer {
    sources: HashMap<Address, VerifiedSource>,
    abis: HashMap<Address, Result<String, String>>,
    creators: HashMap<Address, Address>,
    transfers: HashMap<(Address, Address), Vec<TokenTransfer>>,
    names: HashMap<Address, String>,
    failing_sources: bool,
    requests: AtomicUsize,
}

impl MockExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, address: Address, source: VerifiedSource) -> Self {
        self.names.insert(address, source.contract_name.clone());
        self.sources.insert(address, source);
        self
    }

    pub fn with_abi(mut self, address: Address, abi: &str) -> Self {
        self.abis.insert(address, Ok(abi.to_string()));
        self
    }

    pub fn with_abi_error(mut self, address: Address, err: &str) -> Self {
        self.abis.insert(address, Err(err.to_string()));
        self
    }

    pub fn with_creator(mut self, contract: Address, creator: Address) -> Self {
        self.creators.insert(contract, creator);
        self
    }

    pub fn with_transfers(
        mut self,
        token: Address,
        holder: Address,
        transfers: Vec<TokenTransfer>,
    ) -> Self {
        self.transfers.insert((token, holder), transfers);
        self
    }

    pub fn with_name(mut self, address: Address, name: &str) -> Self {
        self.names.insert(address, name.to_string());
        self
    }

    /// Every source lookup fails with an explorer error
    pub fn failing(mut self) -> Self {
        self.failing_sources = true;
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// A single-file verified source
pub fn sample_source(name: &str) -> VerifiedSource {
    VerifiedSource {
        contract_name: name.to_string(),
        compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
        optimization_used: "1".to_string(),
        license_type: "MIT".to_string(),
        source_code: format!(
            "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\ncontract {} {{ address public owner; }}",
            name
        ),
        abi: None,
    }
}

#[async_trait]
impl SourceFetcher for MockExplorer {
    async fn get_source_code(&self, address: Address) -> Result<VerifiedSource, AuditError> {
        self.hit();
        if self.failing_sources {
            return Err(AuditError::Explorer("explorer unavailable".to_string()));
        }
        self.sources.get(&address).cloned().ok_or_else(|| {
            AuditError::SourceUnavailable(format!("Contract {} is not verified", address))
        })
    }

    async fn get_abi(&self, address: Address) -> Result<Option<String>, AuditError> {
        self.hit();
        match self.abis.get(&address) {
            Some(Ok(abi)) => Ok(Some(abi.clone())),
            Some(Err(e)) => Err(AuditError::Explorer(e.clone())),
            None => Ok(None),
        }
    }

    async fn get_contract_creator(&self, address: Address) -> Result<Option<Address>, AuditError> {
        self.hit();
        Ok(self.creators.get(&address).copied())
    }

    async fn get_token_transfers(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<Vec<TokenTransfer>, AuditError> {
        self.hit();
        Ok(self
            .transfers
            .get(&(token, holder))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_contract_name(&self, address: Address) -> Result<Option<String>, AuditError> {
        self.hit();
        Ok(self.names.get(&address).cloned())
    }
}
