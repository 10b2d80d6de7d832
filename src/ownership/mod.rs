//! Ownership inference.
//!
//! Four independent probes look for a live privileged holder: well-known
//! accessor selectors, ownership-shaped functions declared in the verified ABI,
//! the transparent-proxy admin slot and the `OwnershipTransferred` history.
//! Their signals fold into one [`OwnershipVerdict`]. Only malformed input and
//! addresses without code fail the whole check.

pub mod probes;

use alloy::primitives::{b256, B256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

use crate::blockchain::ChainReader;
use crate::explorer::SourceFetcher;
use crate::types::{
    AuditError, ContractAddress, OwnershipSignal, OwnershipVerdict, ProbeSource,
};

use probes::ProbeReport;

/// Accessors tried by raw selector, in this order
pub const STANDARD_SELECTORS: [(&str, [u8; 4]); 6] = [
    ("owner", [0x8d, 0xa5, 0xcb, 0x5b]),
    ("getOwner", [0x89, 0x3d, 0x20, 0xe8]),
    ("admin", [0xf8, 0x51, 0xa4, 0x40]),
    ("getAdmin", [0x6e, 0x99, 0x60, 0xc3]),
    ("manager", [0x48, 0x1c, 0x6a, 0x75]),
    ("governance", [0x5a, 0xa6, 0xe6, 0x75]),
];

/// Lowercased function names treated as an ownership interface in an ABI
pub const ABI_OWNERSHIP_NAMES: [&str; 7] = [
    "owner",
    "getowner",
    "admin",
    "getadmin",
    "manager",
    "governance",
    "controller",
];

/// EIP-1967 admin slot: keccak256("eip1967.proxy.admin") - 1
pub const PROXY_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

pub struct OwnershipEngine {
    reader: Arc<dyn ChainReader>,
    abi_source: Option<Arc<dyn SourceFetcher>>,
}

impl OwnershipEngine {
    /// Without an ABI source the ABI probe is skipped
    pub fn new(reader: Arc<dyn ChainReader>, abi_source: Option<Arc<dyn SourceFetcher>>) -> Self {
        Self { reader, abi_source }
    }

    /// Validate `raw`, then probe the contract behind it
    pub async fn check(&self, raw: &str) -> Result<OwnershipVerdict, AuditError> {
        let contract = ContractAddress::parse(raw)?;
        self.check_address(contract).await
    }

    pub async fn check_address(
        &self,
        contract: ContractAddress,
    ) -> Result<OwnershipVerdict, AuditError> {
        self.ensure_contract(contract).await?;
        Ok(self.probe(contract).await)
    }

    /// Fail with `NotAContract` when nothing is deployed at `contract`
    pub async fn ensure_contract(&self, contract: ContractAddress) -> Result<(), AuditError> {
        let code = self.reader.get_code(contract.address()).await?;
        if code.is_empty() {
            return Err(AuditError::NotAContract(contract.to_string()));
        }
        Ok(())
    }

    /// Run the four probes against a contract known to have code. Probe
    /// failures end up on the verdict, never as an error.
    pub async fn probe(&self, contract: ContractAddress) -> OwnershipVerdict {
        let address = contract.address();

        info!("Analyzing contract ownership: {}", contract);

        let reader = self.reader.as_ref();
        let (standard, abi, proxy, transfer) = tokio::join!(
            probes::standard_selectors(reader, address),
            probes::abi_functions(reader, self.abi_source.as_deref(), address),
            probes::proxy_admin_slot(reader, address),
            probes::transfer_events(reader, address),
        );

        let verdict = fold(standard, abi, proxy, transfer);

        info!(
            "Ownership check for {}: {} (renounced={}, owner_found={})",
            contract,
            verdict.status(),
            verdict.renounced,
            verdict.owner_found
        );

        verdict
    }
}

/// Combine probe reports. Order-independent: a positive signal from any
/// probe clears `renounced` and sets `owner_found`, and nothing sets them back.
fn fold(
    standard: ProbeReport,
    abi: ProbeReport,
    proxy: ProbeReport,
    transfer: ProbeReport,
) -> OwnershipVerdict {
    let mut verdict = OwnershipVerdict {
        renounced: true,
        owner_found: false,
        function_call_results: BTreeMap::new(),
        abi_ownership_function_names: BTreeSet::new(),
        abi_error: abi.annotation,
        proxy_admin_address: None,
        proxy_admin_error: proxy.annotation,
        last_ownership_transfer: transfer.transfer,
        transfer_event_error: transfer.annotation,
        signals: Vec::new(),
    };

    // A declared ownership interface means the capability was never removed
    if !abi.declared_names.is_empty() {
        verdict.renounced = false;
    }
    verdict.abi_ownership_function_names = abi.declared_names;

    let signals = standard
        .signals
        .into_iter()
        .chain(abi.signals)
        .chain(proxy.signals)
        .chain(transfer.signals);

    for signal in signals {
        observe(&mut verdict, signal);
    }

    verdict
}

fn observe(verdict: &mut OwnershipVerdict, signal: OwnershipSignal) {
    if signal.is_owner_positive() {
        verdict.renounced = false;
        verdict.owner_found = true;

        if let Some(holder) = signal.holder {
            match signal.source {
                ProbeSource::StandardSelector => {
                    verdict
                        .function_call_results
                        .insert(signal.subject.clone(), holder);
                }
                ProbeSource::ProxyAdminSlot => verdict.proxy_admin_address = Some(holder),
                ProbeSource::AbiFunction | ProbeSource::TransferEvent => {}
            }
        }
    }
    verdict.signals.push(signal);
}
