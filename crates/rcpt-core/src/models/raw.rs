//! Untyped model output.
//!
//! `RawExtraction` is the tolerant-decode boundary: it never rejects input.
//! Missing keys, wrong JSON types and non-object roots all read as absent, and
//! every guess about the payload's shape lives here or in the normalizer.

use serde_json::Value;

/// A model-generated invoice payload with no guaranteed structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    value: Value,
}

impl RawExtraction {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Look up a top-level field by its camelCase name, falling back to the
    /// snake_case spelling some models prefer.
    pub fn field(&self, key: &str) -> Option<&Value> {
        lookup(&self.value, key)
    }

    /// Field as trimmed text; numbers are rendered, other types are absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.field(key).and_then(value_text)
    }

    /// Raw line item entries. Non-array values yield no items.
    pub fn line_items(&self) -> Vec<RawLineItem<'_>> {
        match self.field("lineItems") {
            Some(Value::Array(items)) => items.iter().map(RawLineItem).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Value> for RawExtraction {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// View over one raw line item entry.
#[derive(Debug, Clone, Copy)]
pub struct RawLineItem<'a>(&'a Value);

impl<'a> RawLineItem<'a> {
    pub fn field(&self, key: &str) -> Option<&'a Value> {
        lookup(self.0, key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.field(key).and_then(value_text)
    }
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = value.as_object()?;
    let found = obj.get(key).or_else(|| obj.get(&snake_case(key)))?;
    if found.is_null() { None } else { Some(found) }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
