//! Reading and checking the model's JSON answer.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{ExtractionError, ValidationWarning};
use crate::invoice::rules::parse_number;
use crate::invoice::rules::patterns::CODE_FENCE;
use crate::models::raw::RawExtraction;

/// Body of a surrounding markdown code fence, or the trimmed text.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
}

/// Outermost `{...}` span, dropping any prose around it.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model response into a raw extraction.
pub fn parse_response(text: &str) -> Result<RawExtraction, ExtractionError> {
    let body = strip_code_fence(text);
    let json = extract_json_object(body).ok_or_else(|| ExtractionError::ResponseParse {
        reason: "no JSON object in response".to_string(),
    })?;

    let value: Value = serde_json::from_str(json).map_err(|e| ExtractionError::ResponseParse {
        reason: e.to_string(),
    })?;

    Ok(RawExtraction::new(value))
}

/// Schema check for observability. Never blocks normalization.
pub fn validate(raw: &RawExtraction) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    match raw.field("grandTotal") {
        None => warnings.push(ValidationWarning::new("grandTotal", "missing")),
        Some(v) if parse_number(v).is_none() => {
            warnings.push(ValidationWarning::new("grandTotal", "not a number"))
        }
        Some(_) => {}
    }

    match raw.field("confidence").map(parse_number) {
        None => warnings.push(ValidationWarning::new("confidence", "missing")),
        Some(None) => warnings.push(ValidationWarning::new("confidence", "not a number")),
        Some(Some(c)) if c < Decimal::ZERO || c > Decimal::ONE => {
            warnings.push(ValidationWarning::new("confidence", format!("{} is outside 0..1", c)))
        }
        Some(Some(_)) => {}
    }

    if let Some(items) = raw.field("lineItems") {
        if !items.is_array() {
            warnings.push(ValidationWarning::new("lineItems", "not an array"));
        }
    }

    warnings
}
