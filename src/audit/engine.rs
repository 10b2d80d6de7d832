use std::sync::Arc;
use tracing::{debug, info};

use crate::assessment::prompts::{
    conclusion_prompt, item_prompt, ContractContext, FindingDigest,
    CONCLUSION_SYSTEM_INSTRUCTION, ITEM_SYSTEM_INSTRUCTION,
};
use crate::assessment::{AssessmentRequester, ConclusionAssessment, ItemAssessment};
use crate::blockchain::{token, ChainReader};
use crate::explorer::{strip_comments, SourceFetcher};
use crate::ownership::OwnershipEngine;
use crate::types::{
    AuditError, AuditReport, Conclusion, ContractAddress, ItemFinding, SourceSummary,
};

use super::template::{fill_template, Placeholders};

/// Runs one full audit: data gathering, checklist assessment, conclusion
pub struct AuditEngine {
    reader: Arc<dyn ChainReader>,
    explorer: Arc<dyn SourceFetcher>,
    ownership: Arc<OwnershipEngine>,
    requester: Arc<AssessmentRequester>,
}

impl AuditEngine {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        explorer: Arc<dyn SourceFetcher>,
        ownership: Arc<OwnershipEngine>,
        requester: Arc<AssessmentRequester>,
    ) -> Self {
        Self {
            reader,
            explorer,
            ownership,
            requester,
        }
    }

    pub async fn run_audit(&self, contract: ContractAddress) -> Result<AuditReport, AuditError> {
        let address = contract.address();
        info!("Starting audit for {}", contract);

        // Phase 1: pre-check, then gather everything concurrently
        self.ownership.ensure_contract(contract).await?;

        let reader = self.reader.as_ref();
        let (token_data, source, owner, ownership) = tokio::try_join!(
            token::fetch_token_data(reader, address),
            self.explorer.get_source_code(address),
            async { Ok::<_, AuditError>(token::fetch_contract_owner(reader, address).await) },
            async { Ok::<_, AuditError>(self.ownership.probe(contract).await) },
        )?;

        let status = ownership.status();
        let renounce_status = status.label().to_string();
        let proxy_admin_status = ownership.proxy_admin_status();
        debug!("{}: {}; {}", contract, renounce_status, proxy_admin_status);

        // Phase 2: fill the checklist
        let template = fill_template(&Placeholders {
            token_name: token_data.name.clone(),
            token_symbol: token_data.symbol.clone(),
            decimals: token_data.decimals.to_string(),
            total_supply: token_data.total_supply.clone(),
            ownership_renounced: renounce_status.clone(),
            proxy_admin_status: proxy_admin_status.clone(),
        })?;

        let cleaned_source = strip_comments(&source.source_code);
        let context = ContractContext {
            contract_name: if source.contract_name.is_empty() {
                "Unknown"
            } else {
                source.contract_name.as_str()
            },
            renounce_status: &renounce_status,
            proxy_admin_status: &proxy_admin_status,
            source_code: &cleaned_source,
        };

        // Phase 3: one assessment per item, strictly in order
        let mut findings = Vec::new();
        for (category, item) in template.items() {
            let prompt = item_prompt(&context, &item.key, &item.description, &item.instruction);
            let assessed = self
                .requester
                .request::<ItemAssessment>(&item.key, &prompt, ITEM_SYSTEM_INSTRUCTION)
                .await;
            let is_valid = assessed.is_valid();
            let assessment = assessed.into_inner();

            findings.push(ItemFinding {
                category: category.to_string(),
                key: item.key.clone(),
                description: item.description.clone(),
                instruction: item.instruction.clone(),
                red_flag: assessment.red_flag,
                comment: assessment.comment,
                criticality_score: assessment.criticality_score,
                assessed: is_valid,
            });
        }

        // Phase 4: conclusion over all findings
        let prompt = {
            let digest: Vec<FindingDigest<'_>> = findings
                .iter()
                .map(|finding| FindingDigest {
                    key: &finding.key,
                    red_flag: finding.red_flag,
                    comment: &finding.comment,
                    criticality_score: finding.criticality_score,
                    assessed: finding.assessed,
                })
                .collect();
            conclusion_prompt(&digest, &cleaned_source)
        };
        let assessed = self
            .requester
            .request::<ConclusionAssessment>("conclusion", &prompt, CONCLUSION_SYSTEM_INSTRUCTION)
            .await;
        let conclusion_valid = assessed.is_valid();
        let conclusion = assessed.into_inner();

        let report = AuditReport {
            contract_address: contract,
            source: SourceSummary::from(&source),
            owner_address: owner.map(|o| o.to_string()),
            renounce_status,
            proxy_admin_status,
            header: template.header,
            conclusion: Conclusion {
                summary: conclusion.summary,
                dangers: conclusion.dangers,
                comments: conclusion.comments,
                total_risk_score: conclusion.total_risk_score,
                assessed: conclusion_valid,
            },
            token_data,
            ownership,
            findings,
            audit_by_ai_badge: true,
            contract: source.source_code,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        info!(
            "Audit completed for {}: {} red flags, {} unassessed items, risk score {}",
            contract,
            report.red_flag_count(),
            report.unassessed_count(),
            report.conclusion.total_risk_score
        );

        Ok(report)
    }
}
