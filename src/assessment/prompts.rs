//! Prompt text for the three kinds of assessment

use serde::Serialize;

pub const ITEM_SYSTEM_INSTRUCTION: &str = "You are an AI specializing in auditing smart contracts. \
Provide concise and accurate assessments based on the provided information.";

pub const CONCLUSION_SYSTEM_INSTRUCTION: &str = "You are an AI security auditor specializing in \
smart contract assessments. Provide concise and accurate conclusions based on the provided audit results.";

pub const DISTRIBUTION_SYSTEM_INSTRUCTION: &str = "You are a blockchain expert analyzing Ethereum \
transaction patterns to assess risks and anomalies. Your response must use clear and simple \
language to communicate findings effectively to non-technical stakeholders.";

/// Contract facts shared by every item prompt
pub struct ContractContext<'a> {
    pub contract_name: &'a str,
    pub renounce_status: &'a str,
    pub proxy_admin_status: &'a str,
    pub source_code: &'a str,
}

pub fn item_prompt(
    context: &ContractContext<'_>,
    item_key: &str,
    description: &str,
    instruction: &str,
) -> String {
    format!(
        r#"Audit this smart contract:
Contract Name: {contract_name}
Ownership Renounced: {renounce_status}
Proxy Admin: {proxy_admin_status}
Full Smart Contract: {source_code}

We need to evaluate the audit item "{item_key}".
Description: {description}
Instruction: {instruction}

Please provide a JSON response in the following exact format only:
{{
    "redFlag": true/false,
    "comment": "{{explanation}}",
    "criticalityScore": "{{{{1-10}}}}"
}}

Guidelines:
1. Respond strictly with the JSON object above, without markdown or any text outside it.
2. Keep "comment" to a concise explanation.
3. Base the assessment on the provided source code.
4. First check whether the item applies to this contract. If it does not, set "redFlag" to false and say so in the comment.
5. Take the ownership renouncement status into account and state how it affects the risk of this item.
6. Only set "redFlag" to true for a genuine risk in this contract.
7. "criticalityScore" runs from 1 (very low) to 10 (very high).

Example of a valid response:
{{
    "redFlag": true,
    "comment": "The owner can change fees at any time because ownership is not renounced.",
    "criticalityScore": "8"
}}
"#,
        contract_name = context.contract_name,
        renounce_status = context.renounce_status,
        proxy_admin_status = context.proxy_admin_status,
        source_code = context.source_code,
        item_key = item_key,
        description = description,
        instruction = instruction,
    )
}

/// One line of the findings digest sent with the conclusion prompt
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingDigest<'a> {
    pub key: &'a str,
    pub red_flag: bool,
    pub comment: &'a str,
    pub criticality_score: u8,
    pub assessed: bool,
}

pub fn conclusion_prompt(findings: &[FindingDigest<'_>], source_code: &str) -> String {
    let digest = serde_json::to_string_pretty(findings).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Here is a collection of audit results for various items (redFlag and comment).
Items with "assessed": false could not be evaluated and carry no finding:
{digest}

Please provide a conclusion in valid JSON with the following structure:
{{
    "summary": "...",
    "dangers": ["Danger 1", "Danger 2"],
    "comments": "...",
    "totalRiskScore": "1-10"
}}

Instructions:
1. "summary" gives an overall assessment based on the audit results.
2. "dangers" lists every danger arising from the rights the owners hold in this contract.
3. "comments" holds any additional observations.
4. "totalRiskScore" is a number between 1 and 10, where 10 is the highest risk.
5. Respond strictly with the JSON object, without any additional text.

For context, the smart contract:
{source_code}
"#
    )
}

/// One recipient of the deployer's tokens, as shown to the model
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientDigest<'a> {
    pub address: &'a str,
    pub name: Option<&'a str>,
    pub total_amount: &'a str,
    pub transfer_count: usize,
}

pub fn distribution_prompt(token: &str, recipients: &[RecipientDigest<'_>]) -> String {
    let digest = serde_json::to_string_pretty(recipients).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are evaluating how the deployer of token {token} distributed its supply.
Look for concentration in few wallets, transfers to exchanges or bridges, and patterns that
suggest insider allocations or an imminent dump.

Provide a structured JSON response with your findings and risk assessment. Use the format below:
{{
    "assessment": "A concise summary of risks, patterns, and findings.",
    "riskScore": "A single integer between 0 and 10, where 0 means no risk and 10 indicates very high risk."
}}

Instructions:
1. Use simple, clear language so that non-technical readers understand the findings. Give concrete examples where possible.
2. Respond strictly with the JSON object, without any additional text.
3. "riskScore" is 0 for no risk and 10 for extremely high risk.

Top recipients of the deployer's transfers:
{digest}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_prompt_carries_context() {
        let context = ContractContext {
            contract_name: "TetherToken",
            renounce_status: "Ownership not renounced",
            proxy_admin_status: "No proxy admin detected",
            source_code: "contract TetherToken {}",
        };
        let prompt = item_prompt(&context, "mintFunction", "Can new tokens be minted?", "Look for mint");
        assert!(prompt.contains("Contract Name: TetherToken"));
        assert!(prompt.contains("Ownership Renounced: Ownership not renounced"));
        assert!(prompt.contains("audit item \"mintFunction\""));
        assert!(prompt.contains("\"criticalityScore\": \"{{1-10}}\""));
    }

    #[test]
    fn test_conclusion_prompt_lists_findings() {
        let findings = [FindingDigest {
            key: "blacklist",
            red_flag: true,
            comment: "Owner can blacklist",
            criticality_score: 9,
            assessed: true,
        }];
        let prompt = conclusion_prompt(&findings, "contract A {}");
        assert!(prompt.contains("\"key\": \"blacklist\""));
        assert!(prompt.contains("\"criticalityScore\": 9"));
        assert!(prompt.contains("contract A {}"));
    }
}
