//! The four independent ownership probes.
//!
//! Each probe reports what it saw and never fails; errors become
//! inconclusive signals or annotations that the engine folds into the verdict.

use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::sol_types::SolEvent;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::abi::IOwnable;
use crate::blockchain::{ChainError, ChainReader};
use crate::explorer::SourceFetcher;
use crate::types::{OwnershipSignal, OwnershipTransfer, ProbeSource};

use super::{ABI_OWNERSHIP_NAMES, PROXY_ADMIN_SLOT, STANDARD_SELECTORS};

/// What a single probe observed
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub signals: Vec<OwnershipSignal>,
    /// Ownership-shaped names declared in the ABI (ABI probe only)
    pub declared_names: BTreeSet<String>,
    /// Probe-level failure, if the probe could not run at all
    pub annotation: Option<String>,
    /// Decoded most recent transfer (event probe only)
    pub transfer: Option<OwnershipTransfer>,
}

/// Decode a left-padded address word. Empty, short, all-zero words and words
/// whose low 20 bytes are zero all mean "no holder".
pub fn decode_address_word(raw: &[u8]) -> Option<Address> {
    if raw.len() < 32 {
        return None;
    }
    let address = Address::from_slice(&raw[12..32]);
    (!address.is_zero()).then_some(address)
}

/// Probe 1: call each well-known accessor by its precomputed selector.
/// A revert means the function is absent and leaves no trace.
pub async fn standard_selectors(reader: &dyn ChainReader, contract: Address) -> ProbeReport {
    let mut report = ProbeReport::default();

    for (name, selector) in STANDARD_SELECTORS {
        match reader.call(contract, Bytes::copy_from_slice(&selector)).await {
            Ok(raw) => match decode_address_word(&raw) {
                Some(holder) => {
                    info!("{}() returned {}", name, holder);
                    report
                        .signals
                        .push(OwnershipSignal::positive(ProbeSource::StandardSelector, name, holder));
                }
                None => {
                    debug!("{}() returned no holder", name);
                    report
                        .signals
                        .push(OwnershipSignal::negative(ProbeSource::StandardSelector, name));
                }
            },
            Err(ChainError::Reverted(reason)) => {
                debug!("{}() not callable, treating as absent: {}", name, reason);
            }
            Err(e) => {
                warn!("{}() call failed: {}", name, e);
                report.signals.push(OwnershipSignal::inconclusive(
                    ProbeSource::StandardSelector,
                    name,
                    e.to_string(),
                ));
            }
        }
    }

    report
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<serde_json::Value>,
}

/// Probe 2: find ownership-shaped functions in the verified ABI and call
/// each one that takes no arguments.
pub async fn abi_functions(
    reader: &dyn ChainReader,
    abi_source: Option<&dyn SourceFetcher>,
    contract: Address,
) -> ProbeReport {
    let mut report = ProbeReport::default();

    let Some(abi_source) = abi_source else {
        info!("No ABI source configured, skipping ABI ownership check");
        report.annotation = Some("ABI source not configured".to_string());
        return report;
    };

    let abi_json = match abi_source.get_abi(contract).await {
        Ok(Some(abi)) => abi,
        Ok(None) => {
            info!("Contract source not verified, skipping ABI ownership check");
            report.annotation = Some("Contract source code not verified".to_string());
            return report;
        }
        Err(e) => {
            warn!("Failed to fetch ABI, skipping ABI ownership check: {}", e);
            report.annotation = Some(e.to_string());
            return report;
        }
    };

    let entries: Vec<AbiEntry> = match serde_json::from_str(&abi_json) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to parse ABI: {}", e);
            report.annotation = Some(format!("Malformed ABI: {}", e));
            return report;
        }
    };

    let mut callable = BTreeSet::new();
    for entry in entries.iter().filter(|e| e.kind == "function") {
        if !ABI_OWNERSHIP_NAMES.contains(&entry.name.to_ascii_lowercase().as_str()) {
            continue;
        }
        report.declared_names.insert(entry.name.clone());
        if entry.inputs.is_empty() {
            callable.insert(entry.name.clone());
        } else {
            report.signals.push(OwnershipSignal::inconclusive(
                ProbeSource::AbiFunction,
                &entry.name,
                "function requires arguments",
            ));
        }
    }

    if report.declared_names.is_empty() {
        debug!("No ownership functions declared in ABI");
        return report;
    }
    info!("Ownership functions declared in ABI: {:?}", report.declared_names);

    for name in callable {
        let signature_hash = keccak256(format!("{}()", name));
        match reader
            .call(contract, Bytes::copy_from_slice(&signature_hash[..4]))
            .await
        {
            Ok(raw) => match decode_address_word(&raw) {
                Some(holder) => {
                    info!("{} from ABI returned {}", name, holder);
                    report
                        .signals
                        .push(OwnershipSignal::positive(ProbeSource::AbiFunction, name, holder));
                }
                None => report
                    .signals
                    .push(OwnershipSignal::negative(ProbeSource::AbiFunction, name)),
            },
            Err(e) => {
                warn!("Calling {} from ABI failed: {}", name, e);
                report.signals.push(OwnershipSignal::inconclusive(
                    ProbeSource::AbiFunction,
                    name,
                    e.to_string(),
                ));
            }
        }
    }

    report
}

/// Probe 3: read the transparent-proxy admin slot
pub async fn proxy_admin_slot(reader: &dyn ChainReader, contract: Address) -> ProbeReport {
    let mut report = ProbeReport::default();
    let subject = PROXY_ADMIN_SLOT.to_string();

    match reader.get_storage_at(contract, PROXY_ADMIN_SLOT).await {
        Ok(word) => match decode_address_word(word.as_slice()) {
            Some(admin) => {
                info!("Proxy admin address: {}", admin);
                report
                    .signals
                    .push(OwnershipSignal::positive(ProbeSource::ProxyAdminSlot, subject, admin));
            }
            None => {
                debug!("No proxy admin found");
                report
                    .signals
                    .push(OwnershipSignal::negative(ProbeSource::ProxyAdminSlot, subject));
            }
        },
        Err(e) => {
            debug!("Could not read proxy admin slot: {}", e);
            report.annotation = Some(e.to_string());
            report.signals.push(OwnershipSignal::inconclusive(
                ProbeSource::ProxyAdminSlot,
                subject,
                e.to_string(),
            ));
        }
    }

    report
}

/// Probe 4: decode the most recent `OwnershipTransferred` event since genesis
pub async fn transfer_events(reader: &dyn ChainReader, contract: Address) -> ProbeReport {
    let mut report = ProbeReport::default();
    let subject = IOwnable::OwnershipTransferred::SIGNATURE;
    let topic: B256 = IOwnable::OwnershipTransferred::SIGNATURE_HASH;

    let logs = match reader.get_logs(contract, topic, 0).await {
        Ok(logs) => logs,
        Err(e) => {
            warn!("Could not fetch ownership transfer events: {}", e);
            report.annotation = Some(e.to_string());
            report.signals.push(OwnershipSignal::inconclusive(
                ProbeSource::TransferEvent,
                subject,
                e.to_string(),
            ));
            return report;
        }
    };

    let Some(last) = logs.last() else {
        debug!("No ownership transfer events found");
        report
            .signals
            .push(OwnershipSignal::negative(ProbeSource::TransferEvent, subject));
        return report;
    };

    let decoded = match IOwnable::OwnershipTransferred::decode_raw_log(
        last.topics.iter().copied(),
        &last.data,
        true,
    ) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Could not decode ownership transfer event: {}", e);
            report.annotation = Some(format!("Undecodable OwnershipTransferred event: {}", e));
            report.signals.push(OwnershipSignal::inconclusive(
                ProbeSource::TransferEvent,
                subject,
                e.to_string(),
            ));
            return report;
        }
    };

    info!(
        "Last ownership transfer: from {} to {}",
        decoded.previousOwner, decoded.newOwner
    );

    report.transfer = Some(OwnershipTransfer {
        previous_owner: decoded.previousOwner,
        new_owner: decoded.newOwner,
        block_number: last.block_number,
    });

    if decoded.newOwner.is_zero() {
        report
            .signals
            .push(OwnershipSignal::negative(ProbeSource::TransferEvent, subject));
    } else {
        report.signals.push(OwnershipSignal::positive(
            ProbeSource::TransferEvent,
            subject,
            decoded.newOwner,
        ));
    }

    report
}
