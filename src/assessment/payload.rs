use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use super::extract::{clean_comment, AssessmentError};

static ITEM_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[1-9]|10)$").expect("valid item score pattern"));
static RISK_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]|10)$").expect("valid risk score pattern"));

/// A payload the model is asked to produce.
///
/// `from_json` is the shape check; a mismatch is handled exactly like an
/// extraction failure. `fallback` is the neutral value used once retries run out.
pub trait Assessable: Sized + Send {
    /// Used in log lines
    const KIND: &'static str;

    fn from_json(value: Value) -> Result<Self, AssessmentError>;

    fn fallback() -> Self;
}

/// Verdict for one checklist item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemAssessment {
    pub red_flag: bool,
    pub comment: String,
    pub criticality_score: u8,
}

impl Assessable for ItemAssessment {
    const KIND: &'static str = "item";

    fn from_json(value: Value) -> Result<Self, AssessmentError> {
        let red_flag = value
            .get("redFlag")
            .and_then(Value::as_bool)
            .ok_or_else(|| AssessmentError::Shape("redFlag must be a boolean".to_string()))?;
        let comment = value
            .get("comment")
            .and_then(Value::as_str)
            .ok_or_else(|| AssessmentError::Shape("comment must be a string".to_string()))?;
        let criticality_score = value
            .get("criticalityScore")
            .and_then(|score| parse_score(score, &ITEM_SCORE))
            .ok_or_else(|| {
                AssessmentError::Shape("criticalityScore must be between 1 and 10".to_string())
            })?;

        Ok(Self {
            red_flag,
            comment: clean_comment(comment),
            criticality_score,
        })
    }

    fn fallback() -> Self {
        Self {
            red_flag: false,
            comment: "Error or invalid response.".to_string(),
            criticality_score: 1,
        }
    }
}

/// Overall conclusion over all item findings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConclusionAssessment {
    pub summary: String,
    pub dangers: Vec<String>,
    pub comments: String,
    pub total_risk_score: String,
}

impl Assessable for ConclusionAssessment {
    const KIND: &'static str = "conclusion";

    fn from_json(value: Value) -> Result<Self, AssessmentError> {
        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .ok_or_else(|| AssessmentError::Shape("summary must be a string".to_string()))?;
        let dangers = value
            .get("dangers")
            .and_then(Value::as_array)
            .ok_or_else(|| AssessmentError::Shape("dangers must be an array".to_string()))?;
        let comments = value
            .get("comments")
            .and_then(Value::as_str)
            .ok_or_else(|| AssessmentError::Shape("comments must be a string".to_string()))?;
        let total_risk_score = match value.get("totalRiskScore") {
            Some(Value::String(score)) => score.clone(),
            Some(Value::Number(score)) => score.to_string(),
            _ => {
                return Err(AssessmentError::Shape(
                    "totalRiskScore must be a string or number".to_string(),
                ))
            }
        };

        Ok(Self {
            summary: clean_comment(summary),
            dangers: dangers
                .iter()
                .map(|danger| match danger {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
            comments: clean_comment(comments),
            total_risk_score,
        })
    }

    fn fallback() -> Self {
        Self {
            summary: "Could not generate a conclusion.".to_string(),
            dangers: vec![],
            comments: "An error occurred.".to_string(),
            total_risk_score: "N/A".to_string(),
        }
    }
}

/// Risk read of a deployer's token distribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionAssessment {
    pub assessment: String,
    pub risk_score: u8,
}

impl Assessable for DistributionAssessment {
    const KIND: &'static str = "distribution";

    fn from_json(value: Value) -> Result<Self, AssessmentError> {
        let assessment = value
            .get("assessment")
            .and_then(Value::as_str)
            .ok_or_else(|| AssessmentError::Shape("assessment must be a string".to_string()))?;
        let risk_score = value
            .get("riskScore")
            .and_then(|score| parse_score(score, &RISK_SCORE))
            .ok_or_else(|| {
                AssessmentError::Shape("riskScore must be between 0 and 10".to_string())
            })?;

        Ok(Self {
            assessment: clean_comment(assessment),
            risk_score,
        })
    }

    fn fallback() -> Self {
        Self {
            assessment: "An error occurred during the evaluation. Unable to determine risks or provide insights.".to_string(),
            risk_score: 1,
        }
    }
}

/// Scores arrive as numbers or numeric strings
fn parse_score(value: &Value, pattern: &Regex) -> Option<u8> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if !pattern.is_match(&text) {
        return None;
    }
    text.parse().ok()
}
