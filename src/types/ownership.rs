use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which probe produced a signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSource {
    StandardSelector,
    AbiFunction,
    ProxyAdminSlot,
    TransferEvent,
}

/// One probe's finding.
///
/// - owner-positive: `holder` is present and non-zero
/// - owner-negative: no holder and no error
/// - inconclusive: `error` is present
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipSignal {
    pub source: ProbeSource,
    /// Function name, slot or event the probe looked at
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OwnershipSignal {
    pub fn positive(source: ProbeSource, subject: impl Into<String>, holder: Address) -> Self {
        Self {
            source,
            subject: subject.into(),
            holder: Some(holder),
            error: None,
        }
    }

    pub fn negative(source: ProbeSource, subject: impl Into<String>) -> Self {
        Self {
            source,
            subject: subject.into(),
            holder: None,
            error: None,
        }
    }

    pub fn inconclusive(
        source: ProbeSource,
        subject: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source,
            subject: subject.into(),
            holder: None,
            error: Some(error.into()),
        }
    }

    pub fn is_owner_positive(&self) -> bool {
        self.error.is_none() && self.holder.is_some_and(|h| !h.is_zero())
    }

    pub fn is_inconclusive(&self) -> bool {
        self.error.is_some()
    }
}

/// Most recent `OwnershipTransferred` event seen for a contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransfer {
    pub previous_owner: Address,
    pub new_owner: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Aggregate result of the ownership probes.
///
/// Only the ownership engine builds this value. `renounced` starts `true` and
/// can only move to `false`; `owner_found` starts `false` and can only move to
/// `true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipVerdict {
    pub renounced: bool,
    pub owner_found: bool,
    /// Non-zero holders returned by the standard accessors, keyed by accessor name
    pub function_call_results: BTreeMap<String, Address>,
    /// Ownership-shaped function names declared in the verified ABI
    pub abi_ownership_function_names: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_error: Option<String>,
    pub proxy_admin_address: Option<Address>,
    pub proxy_admin_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ownership_transfer: Option<OwnershipTransfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_event_error: Option<String>,
    #[serde(default)]
    pub signals: Vec<OwnershipSignal>,
}

impl OwnershipVerdict {
    /// Three-valued label derived from the two headline flags
    pub fn status(&self) -> OwnershipStatus {
        OwnershipStatus::from_flags(self.renounced, self.owner_found)
    }

    /// Human-readable proxy admin line used in prompts and the report
    pub fn proxy_admin_status(&self) -> String {
        if let Some(admin) = &self.proxy_admin_address {
            format!("Proxy admin found: {}", admin)
        } else if let Some(err) = &self.proxy_admin_error {
            format!("Error checking for proxy admin: {}", err)
        } else {
            "No proxy admin detected".to_string()
        }
    }

    /// Whether any probe could not give an answer
    pub fn has_inconclusive_probes(&self) -> bool {
        self.signals.iter().any(OwnershipSignal::is_inconclusive)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipStatus {
    LikelyRenounced,
    NotRenounced,
    Uncertain,
}

impl OwnershipStatus {
    pub fn from_flags(renounced: bool, owner_found: bool) -> Self {
        match (renounced, owner_found) {
            (true, false) => OwnershipStatus::LikelyRenounced,
            (false, true) => OwnershipStatus::NotRenounced,
            _ => OwnershipStatus::Uncertain,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OwnershipStatus::LikelyRenounced => "Ownership likely renounced",
            OwnershipStatus::NotRenounced => "Ownership not renounced",
            OwnershipStatus::Uncertain => "Ownership status uncertain",
        }
    }
}

impl fmt::Display for OwnershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
