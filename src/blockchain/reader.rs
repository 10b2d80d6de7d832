use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, TransactionInput, TransactionRequest},
    transports::{
        http::{Client, Http},
        RpcError, TransportResult,
    },
};
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::AuditError;

type HttpProvider = RootProvider<Http<Client>, Ethereum>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The node answered with an execution error (revert, missing function)
    #[error("call reverted: {0}")]
    Reverted(String),

    /// Transport-level failure on every configured endpoint
    #[error("rpc failure: {0}")]
    Rpc(String),
}

impl From<ChainError> for AuditError {
    fn from(err: ChainError) -> Self {
        AuditError::Blockchain(err.to_string())
    }
}

/// A log entry reduced to what the ownership probes read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
}

/// Read-only access to an EVM chain
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// `eth_getCode`; empty for externally owned accounts
    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError>;

    /// `eth_getStorageAt` as a raw 32-byte word
    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError>;

    /// `eth_getLogs` for one contract and one topic0, from `from_block` to latest
    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError>;

    /// Chain id reported by the node, used as a liveness check
    async fn get_network(&self) -> Result<u64, ChainError>;
}

/// `ChainReader` over JSON-RPC HTTP endpoints with ordered failover.
///
/// Endpoints are tried in order. Execution errors returned by a node are final
/// and do not fail over, since every node would answer the same.
pub struct RpcChainReader {
    chain_id: u64,
    endpoints: Vec<(Url, HttpProvider)>,
}

impl RpcChainReader {
    pub fn new(chain_id: u64, rpc_urls: &[String]) -> Result<Self, AuditError> {
        if rpc_urls.is_empty() {
            return Err(AuditError::Internal(format!(
                "No RPC URLs available for chain {}",
                chain_id
            )));
        }

        let endpoints = rpc_urls
            .iter()
            .map(|raw| {
                let url = Url::parse(raw)
                    .map_err(|e| AuditError::Internal(format!("Invalid RPC URL {}: {}", raw, e)))?;
                let provider = ProviderBuilder::new().on_http(url.clone());
                Ok((url, provider))
            })
            .collect::<Result<Vec<_>, AuditError>>()?;

        Ok(Self {
            chain_id,
            endpoints,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn with_failover<T, F, Fut>(&self, op: &str, f: F) -> Result<T, ChainError>
    where
        F: Fn(HttpProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::new();

        for (i, (url, provider)) in self.endpoints.iter().enumerate() {
            match f(provider.clone()).await {
                Ok(value) => {
                    if i > 0 {
                        info!("RPC {} succeeded for {} after {} failures", url, op, i);
                    }
                    return Ok(value);
                }
                Err(RpcError::ErrorResp(payload))
                    if is_execution_error(payload.code, &payload.message) =>
                {
                    debug!("{} returned an execution error: {}", op, payload);
                    return Err(ChainError::Reverted(payload.to_string()));
                }
                Err(e) => {
                    warn!("RPC {} failed for {}: {}", url, op, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(ChainError::Rpc(format!(
            "All {} RPCs failed for {} on chain {}. Last error: {}",
            self.endpoints.len(),
            op,
            self.chain_id,
            last_error
        )))
    }
}

/// Whether a JSON-RPC error describes the call itself failing rather than the node.
///
/// Code 3 is the standard revert code. Geth-style nodes report reverts under
/// -32000 and Nethermind under -32015, so those count only when the message
/// says so. Everything else (rate limits, missing headers, range caps) is an
/// endpoint problem and fails over.
fn is_execution_error(code: i64, message: &str) -> bool {
    match code {
        3 => true,
        -32000 | -32015 => {
            let message = message.to_ascii_lowercase();
            message.contains("revert") || message.contains("execution")
        }
        _ => false,
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));

        self.with_failover("eth_call", move |provider| {
            let tx = tx.clone();
            async move { provider.call(&tx).await }
        })
        .await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
        self.with_failover("eth_getCode", move |provider| async move {
            provider.get_code_at(address).await
        })
        .await
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let key = U256::from_be_bytes(slot.0);
        let value = self
            .with_failover("eth_getStorageAt", move |provider| async move {
                provider.get_storage_at(address, key).await
            })
            .await?;

        Ok(B256::from(value.to_be_bytes::<32>()))
    }

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        let filter = Filter::new()
            .address(address)
            .event_signature(topic0)
            .from_block(from_block);

        let logs = self
            .with_failover("eth_getLogs", move |provider| {
                let filter = filter.clone();
                async move { provider.get_logs(&filter).await }
            })
            .await?;

        Ok(logs
            .into_iter()
            .map(|log| LogEntry {
                topics: log.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number: log.block_number,
            })
            .collect())
    }

    async fn get_network(&self) -> Result<u64, ChainError> {
        self.with_failover("eth_chainId", |provider| async move {
            provider.get_chain_id().await
        })
        .await
    }
}
