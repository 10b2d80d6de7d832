//! Deployer distribution analysis.
//!
//! Finds who deployed a token, totals what the deployer sent to each
//! recipient and asks the model to read the resulting distribution.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assessment::prompts::{distribution_prompt, RecipientDigest, DISTRIBUTION_SYSTEM_INSTRUCTION};
use crate::assessment::{AssessmentRequester, DistributionAssessment};
use crate::cache::TtlCache;
use crate::explorer::{SourceFetcher, TokenTransfer};
use crate::types::{AuditError, ContractAddress};

/// Recipients kept after ranking
pub const TOP_RECIPIENTS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientTransfer {
    pub hash: String,
    pub amount: String,
    pub timestamp: Option<String>,
}

/// Everything the deployer sent to one address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientTotal {
    pub address: String,
    pub name: Option<String>,
    /// Decimal-scaled sum
    pub total_amount: String,
    pub transfer_count: usize,
    pub transactions: Vec<RecipientTransfer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferAnalysis {
    pub contract_address: String,
    pub deployer_address: String,
    pub top_recipients: Vec<RecipientTotal>,
    pub assessment: String,
    pub risk_score: u8,
    pub assessed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TransferOutcome {
    Analysis(TransferAnalysis),
    Empty { message: String },
}

impl TransferOutcome {
    fn empty() -> Self {
        TransferOutcome::Empty {
            message: "No transfers found.".to_string(),
        }
    }
}

pub struct TransferAnalyzer {
    explorer: Arc<dyn SourceFetcher>,
    requester: Arc<AssessmentRequester>,
    cache: Arc<TtlCache<TransferAnalysis>>,
}

impl TransferAnalyzer {
    pub fn new(
        explorer: Arc<dyn SourceFetcher>,
        requester: Arc<AssessmentRequester>,
        cache: Arc<TtlCache<TransferAnalysis>>,
    ) -> Self {
        Self {
            explorer,
            requester,
            cache,
        }
    }

    pub async fn analyze(&self, raw: &str) -> Result<TransferOutcome, AuditError> {
        let contract = ContractAddress::parse(raw)?;
        let key = contract.checksummed();

        if let Some(cached) = self.cache.get(&key).await {
            info!("Serving cached transfer analysis for {}", key);
            return Ok(TransferOutcome::Analysis(cached));
        }

        let token = contract.address();
        let deployer = self
            .explorer
            .get_contract_creator(token)
            .await?
            .ok_or_else(|| AuditError::SourceUnavailable(format!("No deployer found for {}", key)))?;
        debug!("Deployer of {} is {}", key, deployer);

        let transfers = self.explorer.get_token_transfers(token, deployer).await?;
        let mut recipients = total_by_recipient(deployer, &transfers);
        if recipients.is_empty() {
            info!("No outgoing transfers from the deployer of {}", key);
            return Ok(TransferOutcome::empty());
        }
        recipients.truncate(TOP_RECIPIENTS);

        for recipient in recipients.iter_mut() {
            recipient.total.name = self.lookup_name(recipient.address).await;
        }

        let prompt = {
            let digest: Vec<RecipientDigest<'_>> = recipients
                .iter()
                .map(|r| RecipientDigest {
                    address: &r.total.address,
                    name: r.total.name.as_deref(),
                    total_amount: &r.total.total_amount,
                    transfer_count: r.total.transfer_count,
                })
                .collect();
            distribution_prompt(&key, &digest)
        };
        let assessed = self
            .requester
            .request::<DistributionAssessment>(&key, &prompt, DISTRIBUTION_SYSTEM_INSTRUCTION)
            .await;
        let is_valid = assessed.is_valid();
        let assessment = assessed.into_inner();

        let analysis = TransferAnalysis {
            contract_address: key.clone(),
            deployer_address: deployer.to_checksum(None),
            top_recipients: recipients.into_iter().map(|r| r.total).collect(),
            assessment: assessment.assessment,
            risk_score: assessment.risk_score,
            assessed: is_valid,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.cache.put(&key, &analysis).await;
        info!(
            "Transfer analysis for {}: {} recipients, risk score {}",
            key,
            analysis.top_recipients.len(),
            analysis.risk_score
        );

        Ok(TransferOutcome::Analysis(analysis))
    }

    async fn lookup_name(&self, address: Address) -> Option<String> {
        match self.explorer.get_contract_name(address).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not name {}: {}", address, e);
                None
            }
        }
    }
}

struct RankedRecipient {
    address: Address,
    raw_total: U256,
    total: RecipientTotal,
}

/// Group the deployer's outgoing transfers by recipient, largest total first
fn total_by_recipient(deployer: Address, transfers: &[TokenTransfer]) -> Vec<RankedRecipient> {
    let mut by_recipient: HashMap<Address, RankedRecipient> = HashMap::new();

    for transfer in transfers {
        let (Ok(from), Ok(to)) = (Address::from_str(&transfer.from), Address::from_str(&transfer.to))
        else {
            warn!("Skipping transfer {} with malformed addresses", transfer.hash);
            continue;
        };
        if from != deployer || to == deployer {
            continue;
        }
        let Ok(value) = U256::from_str(&transfer.value) else {
            warn!("Skipping transfer {} with malformed value", transfer.hash);
            continue;
        };
        let decimals = transfer.token_decimal.parse::<u8>().unwrap_or(0);

        let entry = by_recipient.entry(to).or_insert_with(|| RankedRecipient {
            address: to,
            raw_total: U256::ZERO,
            total: RecipientTotal {
                address: to.to_checksum(None),
                name: None,
                total_amount: String::new(),
                transfer_count: 0,
                transactions: vec![],
            },
        });
        entry.raw_total = entry.raw_total.saturating_add(value);
        entry.total.transfer_count += 1;
        entry.total.total_amount = scale_amount(entry.raw_total, decimals);
        entry.total.transactions.push(RecipientTransfer {
            hash: transfer.hash.clone(),
            amount: scale_amount(value, decimals),
            timestamp: unix_to_rfc3339(&transfer.time_stamp),
        });
    }

    let mut ranked: Vec<RankedRecipient> = by_recipient.into_values().collect();
    ranked.sort_by(|a, b| b.raw_total.cmp(&a.raw_total).then(a.address.cmp(&b.address)));
    ranked
}

/// Render a raw token amount with `decimals` fractional digits, trailing zeros trimmed
fn scale_amount(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

fn unix_to_rfc3339(seconds: &str) -> Option<String> {
    let seconds = seconds.parse::<i64>().ok()?;
    chrono::DateTime::from_timestamp(seconds, 0).map(|time| time.to_rfc3339())
}
