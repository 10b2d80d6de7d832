use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use tracing::{debug, info, warn};

use crate::abi::{IERC20Metadata, IOwnable};
use crate::types::{AuditError, TokenData};

use super::reader::ChainReader;

/// Read ERC-20 metadata. Any failing accessor aborts, the token is not
/// auditable without it.
pub async fn fetch_token_data(
    reader: &dyn ChainReader,
    address: Address,
) -> Result<TokenData, AuditError> {
    debug!("Fetching token metadata for {}", address);

    let (name, symbol, decimals, total_supply) = tokio::try_join!(
        reader.call(address, Bytes::from(IERC20Metadata::nameCall {}.abi_encode())),
        reader.call(address, Bytes::from(IERC20Metadata::symbolCall {}.abi_encode())),
        reader.call(address, Bytes::from(IERC20Metadata::decimalsCall {}.abi_encode())),
        reader.call(address, Bytes::from(IERC20Metadata::totalSupplyCall {}.abi_encode())),
    )?;

    let name = decode_string(&name, "name", |raw| {
        IERC20Metadata::nameCall::abi_decode_returns(raw, true).map(|ret| ret._0)
    })?;
    let symbol = decode_string(&symbol, "symbol", |raw| {
        IERC20Metadata::symbolCall::abi_decode_returns(raw, true).map(|ret| ret._0)
    })?;
    let decimals = IERC20Metadata::decimalsCall::abi_decode_returns(&decimals, true)
        .map_err(|e| AuditError::Blockchain(format!("decimals() decode failed: {}", e)))?
        ._0;
    let total_supply = IERC20Metadata::totalSupplyCall::abi_decode_returns(&total_supply, true)
        .map_err(|e| AuditError::Blockchain(format!("totalSupply() decode failed: {}", e)))?
        ._0;

    info!(
        "Token {} ({}) decimals={} totalSupply={}",
        name, symbol, decimals, total_supply
    );

    Ok(TokenData {
        name,
        symbol,
        decimals,
        total_supply: total_supply.to_string(),
    })
}

/// Current `owner()` of the contract, `None` when the accessor is missing
pub async fn fetch_contract_owner(reader: &dyn ChainReader, address: Address) -> Option<Address> {
    let data = Bytes::from(IOwnable::ownerCall {}.abi_encode());
    match reader.call(address, data).await {
        Ok(raw) => match IOwnable::ownerCall::abi_decode_returns(&raw, true) {
            Ok(ret) => {
                debug!("Current owner of {}: {}", address, ret._0);
                Some(ret._0)
            }
            Err(e) => {
                warn!("Could not decode owner() for {}: {}", address, e);
                None
            }
        },
        Err(e) => {
            warn!("Could not fetch owner for {}: {}", address, e);
            None
        }
    }
}

/// Decode a `string` return, accepting the legacy `bytes32` encoding some
/// early tokens use for `name()`/`symbol()`.
fn decode_string<F>(raw: &[u8], accessor: &str, decode: F) -> Result<String, AuditError>
where
    F: Fn(&[u8]) -> alloy::sol_types::Result<String>,
{
    match decode(raw) {
        Ok(value) => Ok(value),
        Err(e) if raw.len() == 32 => {
            debug!("{}() is not an ABI string ({}), trying bytes32", accessor, e);
            let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
            String::from_utf8(raw[..end].to_vec()).map_err(|e| {
                AuditError::Blockchain(format!("{}() returned invalid UTF-8: {}", accessor, e))
            })
        }
        Err(e) => Err(AuditError::Blockchain(format!(
            "{}() decode failed: {}",
            accessor, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::{address_word, MockChain};
    use alloy::primitives::{address, U256};

    const TOKEN: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

    fn erc20_chain() -> MockChain {
        MockChain::new()
            .with_contract(TOKEN)
            .with_call(
                TOKEN,
                IERC20Metadata::nameCall::SELECTOR,
                IERC20Metadata::nameCall::abi_encode_returns(&("Tether USD".to_string(),)).into(),
            )
            .with_call(
                TOKEN,
                IERC20Metadata::symbolCall::SELECTOR,
                IERC20Metadata::symbolCall::abi_encode_returns(&("USDT".to_string(),)).into(),
            )
            .with_call(
                TOKEN,
                IERC20Metadata::decimalsCall::SELECTOR,
                IERC20Metadata::decimalsCall::abi_encode_returns(&(6u8,)).into(),
            )
            .with_call(
                TOKEN,
                IERC20Metadata::totalSupplyCall::SELECTOR,
                IERC20Metadata::totalSupplyCall::abi_encode_returns(&(U256::from(
                    96_219_585_450_584_335u64,
                ),))
                .into(),
            )
    }

    #[tokio::test]
    async fn test_fetch_token_data() {
        let chain = erc20_chain();
        let data = fetch_token_data(&chain, TOKEN).await.unwrap();
        assert_eq!(data.name, "Tether USD");
        assert_eq!(data.symbol, "USDT");
        assert_eq!(data.decimals, 6);
        assert_eq!(data.total_supply, "96219585450584335");
    }

    #[tokio::test]
    async fn test_bytes32_symbol_is_accepted() {
        let mut word = [0u8; 32];
        word[..3].copy_from_slice(b"MKR");
        let chain = erc20_chain().with_call(
            TOKEN,
            IERC20Metadata::symbolCall::SELECTOR,
            Bytes::from(word.to_vec()),
        );
        let data = fetch_token_data(&chain, TOKEN).await.unwrap();
        assert_eq!(data.symbol, "MKR");
    }

    #[tokio::test]
    async fn test_missing_accessor_aborts() {
        let chain = MockChain::new().with_contract(TOKEN);
        let err = fetch_token_data(&chain, TOKEN).await.unwrap_err();
        assert!(matches!(err, AuditError::Blockchain(_)));
    }

    #[tokio::test]
    async fn test_fetch_contract_owner() {
        let owner = address!("1111111111111111111111111111111111111111");
        let chain = MockChain::new().with_call(TOKEN, IOwnable::ownerCall::SELECTOR, address_word(owner));
        assert_eq!(fetch_contract_owner(&chain, TOKEN).await, Some(owner));

        let without_owner = MockChain::new();
        assert_eq!(fetch_contract_owner(&without_owner, TOKEN).await, None);
    }
}
