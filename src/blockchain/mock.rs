//! In-memory `ChainReader` for tests

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::reader::{ChainError, ChainReader, LogEntry};

/// Unanswered calls revert, unset slots read zero, unset log queries are empty.
#[derive(Default)]
pub struct MockChain {
    code: HashMap<Address, Bytes>,
    calls: HashMap<(Address, [u8; 4]), Result<Bytes, ChainError>>,
    storage: HashMap<(Address, B256), Result<B256, ChainError>>,
    logs: HashMap<Address, Result<Vec<LogEntry>, ChainError>>,
    requests: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give the address some deployed bytecode
    pub fn with_contract(mut self, address: Address) -> Self {
        self.code
            .insert(address, Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]));
        self
    }

    pub fn with_call(mut self, address: Address, selector: [u8; 4], result: Bytes) -> Self {
        self.calls.insert((address, selector), Ok(result));
        self
    }

    pub fn with_call_error(mut self, address: Address, selector: [u8; 4], err: ChainError) -> Self {
        self.calls.insert((address, selector), Err(err));
        self
    }

    pub fn with_storage(mut self, address: Address, slot: B256, value: B256) -> Self {
        self.storage.insert((address, slot), Ok(value));
        self
    }

    pub fn with_storage_error(mut self, address: Address, slot: B256, err: ChainError) -> Self {
        self.storage.insert((address, slot), Err(err));
        self
    }

    pub fn with_logs(mut self, address: Address, logs: Vec<LogEntry>) -> Self {
        self.logs.insert(address, Ok(logs));
        self
    }

    pub fn with_logs_error(mut self, address: Address, err: ChainError) -> Self {
        self.logs.insert(address, Err(err));
        self
    }

    /// Number of requests served so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Left-pad an address into a 32-byte return word
pub fn address_word(address: Address) -> Bytes {
    Bytes::from(B256::left_padding_from(address.as_slice()).to_vec())
}

pub fn address_topic(address: Address) -> B256 {
    B256::left_padding_from(address.as_slice())
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.hit();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        self.calls
            .get(&(to, selector))
            .cloned()
            .unwrap_or_else(|| Err(ChainError::Reverted("execution reverted".to_string())))
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
        self.hit();
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        self.hit();
        self.storage
            .get(&(address, slot))
            .cloned()
            .unwrap_or(Ok(B256::ZERO))
    }

    async fn get_logs(
        &self,
        address: Address,
        _topic0: B256,
        _from_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        self.hit();
        self.logs.get(&address).cloned().unwrap_or(Ok(vec![]))
    }

    async fn get_network(&self) -> Result<u64, ChainError> {
        self.hit();
        Ok(1)
    }
}
