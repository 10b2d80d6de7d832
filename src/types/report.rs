use serde::{Deserialize, Serialize};

use super::{ContractAddress, OwnershipVerdict};

/// ERC-20 metadata read from chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Base-10 rendering of the 256-bit supply
    pub total_supply: String,
}

/// Verified source as returned by the block explorer, bundles already flattened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSource {
    pub contract_name: String,
    pub compiler_version: String,
    pub optimization_used: String,
    pub license_type: String,
    pub source_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub contract_name: String,
    pub compiler_version: String,
    pub optimization_used: String,
    pub license_type: String,
    pub source_length: usize,
}

impl From<&VerifiedSource> for SourceSummary {
    fn from(source: &VerifiedSource) -> Self {
        Self {
            contract_name: source.contract_name.clone(),
            compiler_version: source.compiler_version.clone(),
            optimization_used: source.optimization_used.clone(),
            license_type: source.license_type.clone(),
            source_length: source.source_code.len(),
        }
    }
}

/// Filled report header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportHeader {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: String,
    pub total_supply: String,
    pub ownership_renounced: String,
    pub proxy_admin_status: String,
}

/// Scored checklist item.
///
/// `assessed == false` means the text generator never produced a valid answer
/// and the neutral fallback was stored instead of a finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFinding {
    pub category: String,
    pub key: String,
    pub description: String,
    pub instruction: String,
    pub red_flag: bool,
    pub comment: String,
    pub criticality_score: u8,
    pub assessed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conclusion {
    pub summary: String,
    pub dangers: Vec<String>,
    pub comments: String,
    pub total_risk_score: String,
    pub assessed: bool,
}

/// The full audit artifact. Built once per address and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub contract_address: ContractAddress,
    pub token_data: TokenData,
    pub source: SourceSummary,
    pub owner_address: Option<String>,
    pub ownership: OwnershipVerdict,
    pub renounce_status: String,
    pub proxy_admin_status: String,
    pub header: ReportHeader,
    pub findings: Vec<ItemFinding>,
    pub conclusion: Conclusion,
    pub audit_by_ai_badge: bool,
    /// Original verified source text
    pub contract: String,
    /// RFC 3339
    pub created_at: String,
}

impl AuditReport {
    /// Number of checklist items that fell back to the neutral value
    pub fn unassessed_count(&self) -> usize {
        self.findings.iter().filter(|f| !f.assessed).count()
    }

    pub fn red_flag_count(&self) -> usize {
        self.findings.iter().filter(|f| f.assessed && f.red_flag).count()
    }
}

/// Record shape persisted in the report cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedReport {
    pub contract_address: String,
    pub audit_report: AuditReport,
    pub created_at: String,
}

impl CachedReport {
    pub fn new(report: AuditReport) -> Self {
        Self {
            contract_address: report.contract_address.to_string(),
            created_at: report.created_at.clone(),
            audit_report: report,
        }
    }
}

#[cfg(test)]
impl AuditReport {
    /// A small fully-populated report for tests
    pub(crate) fn sample() -> Self {
        use super::{OwnershipTransfer, OwnershipVerdict};
        use alloy::primitives::address;
        use std::collections::{BTreeMap, BTreeSet};

        let owner = address!("C6CDE7C39eB2f0F0095F41570af89eFC2C1Ea828");
        let ownership = OwnershipVerdict {
            renounced: false,
            owner_found: true,
            function_call_results: BTreeMap::from([("owner".to_string(), owner)]),
            abi_ownership_function_names: BTreeSet::from(["owner".to_string()]),
            abi_error: None,
            proxy_admin_address: None,
            proxy_admin_error: None,
            last_ownership_transfer: Some(OwnershipTransfer {
                previous_owner: alloy::primitives::Address::ZERO,
                new_owner: owner,
                block_number: Some(4_634_748),
            }),
            transfer_event_error: None,
            signals: vec![],
        };

        Self {
            contract_address: ContractAddress::from(address!(
                "dAC17F958D2ee523a2206206994597C13D831ec7"
            )),
            token_data: TokenData {
                name: "Tether USD".to_string(),
                symbol: "USDT".to_string(),
                decimals: 6,
                total_supply: "115792089237316195423570985008687907853269984665640564039457584007913129639935".to_string(),
            },
            source: SourceSummary {
                contract_name: "TetherToken".to_string(),
                compiler_version: "v0.4.18+commit.9cf6e910".to_string(),
                optimization_used: "0".to_string(),
                license_type: "None".to_string(),
                source_length: 22,
            },
            owner_address: Some(owner.to_string()),
            renounce_status: ownership.status().label().to_string(),
            proxy_admin_status: ownership.proxy_admin_status(),
            ownership,
            header: ReportHeader {
                token_name: "Tether USD".to_string(),
                token_symbol: "USDT".to_string(),
                decimals: "6".to_string(),
                total_supply: "1000".to_string(),
                ownership_renounced: "Ownership not renounced".to_string(),
                proxy_admin_status: "No proxy admin detected".to_string(),
            },
            findings: vec![
                ItemFinding {
                    category: "Ownership".to_string(),
                    key: "blacklist".to_string(),
                    description: "Can the owner block addresses?".to_string(),
                    instruction: "Look for blacklist mappings".to_string(),
                    red_flag: true,
                    comment: "addBlackList lets the owner freeze any holder".to_string(),
                    criticality_score: 8,
                    assessed: true,
                },
                ItemFinding {
                    category: "Ownership".to_string(),
                    key: "pause".to_string(),
                    description: "Can transfers be paused?".to_string(),
                    instruction: "Look for whenNotPaused".to_string(),
                    red_flag: false,
                    comment: "Error or invalid response.".to_string(),
                    criticality_score: 1,
                    assessed: false,
                },
            ],
            conclusion: Conclusion {
                summary: "Centrally controlled stablecoin".to_string(),
                dangers: vec!["Owner can blacklist".to_string()],
                comments: "None".to_string(),
                total_risk_score: "7".to_string(),
                assessed: true,
            },
            audit_by_ai_badge: true,
            contract: "contract TetherToken {}".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }
}
