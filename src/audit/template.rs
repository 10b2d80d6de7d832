use serde::Deserialize;
use serde_json::Value;

use crate::types::{AuditError, ReportHeader};

const CHECKLIST_TEMPLATE: &str = include_str!("template.json");

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChecklistTemplate {
    pub header: ReportHeader,
    pub categories: Vec<ChecklistCategory>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChecklistCategory {
    pub name: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub key: String,
    pub description: String,
    pub instruction: String,
}

impl ChecklistTemplate {
    /// Items in checklist order, paired with their category name
    pub fn items(&self) -> impl Iterator<Item = (&str, &ChecklistItem)> {
        self.categories.iter().flat_map(|category| {
            category
                .items
                .iter()
                .map(move |item| (category.name.as_str(), item))
        })
    }
}

/// Values substituted for the `{{...}}` placeholders
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: String,
    pub total_supply: String,
    pub ownership_renounced: String,
    pub proxy_admin_status: String,
}

impl Placeholders {
    fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("{{Token Name}}", self.token_name.as_str()),
            ("{{Token Symbol}}", self.token_symbol.as_str()),
            ("{{Decimals}}", self.decimals.as_str()),
            ("{{Total Supply}}", self.total_supply.as_str()),
            ("{{Ownership Renounced}}", self.ownership_renounced.as_str()),
            ("{{Proxy Admin Status}}", self.proxy_admin_status.as_str()),
        ]
    }
}

/// Load the embedded checklist with every placeholder filled in
pub fn fill_template(placeholders: &Placeholders) -> Result<ChecklistTemplate, AuditError> {
    let mut template: Value = serde_json::from_str(CHECKLIST_TEMPLATE)
        .map_err(|e| AuditError::Internal(format!("Invalid checklist template: {}", e)))?;

    fill_value(&mut template, &placeholders.pairs());

    serde_json::from_value(template)
        .map_err(|e| AuditError::Internal(format!("Invalid checklist template: {}", e)))
}

fn fill_value(value: &mut Value, pairs: &[(&str, &str)]) {
    match value {
        Value::String(text) => {
            for (placeholder, replacement) in pairs {
                if text.contains(placeholder) {
                    *text = text.replace(placeholder, replacement);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| fill_value(item, pairs)),
        Value::Object(map) => map.values_mut().for_each(|item| fill_value(item, pairs)),
        _ => {}
    }
}
