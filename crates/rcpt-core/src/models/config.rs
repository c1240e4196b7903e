//! Configuration structures for the receipt pipeline.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extraction::{RetryPolicy, dedup_models};

/// Main configuration for rcpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Vision model configuration.
    pub extraction: ExtractionConfig,

    /// Quota configuration.
    pub usage: UsageConfig,

    /// Spreadsheet projection configuration.
    pub sheet: SheetConfig,
}

/// Vision model and retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Model tried first.
    pub primary_model: String,

    /// Models tried after the primary, in order. Duplicates are skipped.
    pub fallback_models: Vec<String>,

    /// Attempts per model.
    pub max_attempts: u32,

    /// Base rate-limit backoff; doubles with each attempt.
    pub rate_limit_base_delay_ms: u64,

    /// Longest a single model call may take.
    pub request_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            primary_model: "gemini-2.5-flash".to_string(),
            fallback_models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
            ],
            max_attempts: 3,
            rate_limit_base_delay_ms: 5000,
            request_timeout_secs: 120,
        }
    }
}

/// Quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Monthly extraction limit. Keep it below the provider's billing ceiling.
    pub monthly_limit: u64,

    /// How long a cached count is trusted.
    pub cache_ttl_secs: u64,

    /// Limit reported for a tenant when the directory cannot be read.
    pub default_tenant_quota: u64,

    /// Longest a single usage store or tenant directory call may take.
    pub store_timeout_ms: u64,

    /// File used by the file-backed usage ledger.
    pub ledger_path: PathBuf,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            monthly_limit: 450,
            cache_ttl_secs: 60,
            default_tenant_quota: 100,
            store_timeout_ms: 10_000,
            ledger_path: PathBuf::from("usage.json"),
        }
    }
}

/// Spreadsheet projection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Rate for the derived "Additional VAT" column.
    pub additional_vat_rate: Decimal,

    /// chrono format for the "Processed At" column.
    pub timestamp_format: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            additional_vat_rate: Decimal::new(7, 2),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Ordered, de-duplicated model chain: primary first.
    pub fn model_chain(&self) -> Vec<String> {
        dedup_models(
            std::iter::once(self.extraction.primary_model.as_str())
                .chain(self.extraction.fallback_models.iter().map(String::as_str)),
        )
    }

    /// Retry policy derived from the extraction section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.extraction.max_attempts.max(1),
            rate_limit_base_delay: Duration::from_millis(self.extraction.rate_limit_base_delay_ms),
        }
    }

    /// Bound on a single model call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.request_timeout_secs)
    }

    /// Cache window for the monthly ledger.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.usage.cache_ttl_secs)
    }
}
