pub mod reader;
pub mod token;

#[cfg(test)]
pub mod mock;

pub use reader::{ChainError, ChainReader, LogEntry, RpcChainReader};
