//! 13-digit tax identification number extraction.

use serde_json::Value;

use super::FieldExtractor;
use super::patterns::{DIGIT_RUN, TAX_ID_GROUP_SEPARATORS, TAX_ID_SEPARATORS};

/// Length of a tax identification number.
pub const TAX_ID_LEN: usize = 13;

/// Tax ID field extractor.
pub struct TaxIdExtractor;

impl TaxIdExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TaxIdExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TaxIdExtractor {
    type Output = String;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Spaced-out IDs (`0 1055 45123 45 6`) are joined first. When joining
    /// glues an ID onto a neighbouring number, each whitespace-delimited
    /// group is tried on its own.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let joined = thirteen_digit_runs(&TAX_ID_SEPARATORS.replace_all(text, ""));
        if !joined.is_empty() {
            return joined;
        }

        text.split_whitespace()
            .flat_map(|group| thirteen_digit_runs(&TAX_ID_GROUP_SEPARATORS.replace_all(group, "")))
            .collect()
    }
}

fn thirteen_digit_runs(compact: &str) -> Vec<String> {
    DIGIT_RUN
        .find_iter(compact)
        .filter(|m| m.as_str().len() == TAX_ID_LEN)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract the first 13-digit tax ID from text.
pub fn extract_tax_id(text: &str) -> Option<String> {
    TaxIdExtractor::new().extract(text)
}

/// Extract a tax ID from a JSON string or number.
pub fn extract_tax_id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => extract_tax_id(s),
        Value::Number(n) => extract_tax_id(&n.to_string()),
        _ => None,
    }
}
