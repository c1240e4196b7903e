//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Model extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// External store error (rows, usage, tenants, files).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while calling the vision model and reading its answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The model rejected the call with a rate-limit signal (429-class).
    #[error("model {model} is rate limited: {message}")]
    RateLimited { model: String, message: String },

    /// The model does not exist or is not served (404-class).
    #[error("model {model} is unavailable: {message}")]
    ModelUnavailable { model: String, message: String },

    /// Any other model-call failure.
    #[error("model {model} call failed: {message}")]
    Fatal { model: String, message: String },

    /// The model answered, but not with a JSON object.
    #[error("could not parse model response: {reason}")]
    ResponseParse { reason: String },

    /// No model identifiers were configured.
    #[error("no extraction models configured")]
    EmptyModelChain,
}

impl ExtractionError {
    /// Short diagnostic that is safe to show to an end user.
    pub fn summary(&self) -> &'static str {
        match self {
            ExtractionError::RateLimited { .. } => "service busy",
            ExtractionError::ModelUnavailable { .. } => "model unavailable",
            ExtractionError::Fatal { .. } => "model error",
            ExtractionError::ResponseParse { .. } => "unreadable model response",
            ExtractionError::EmptyModelChain => "not configured",
        }
    }

    /// Whether the error is the rate-limit (transient) class.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractionError::RateLimited { .. })
    }
}

/// Errors returned by external stores.
///
/// The usage ledgers treat every variant as "ledger unavailable": reads fail
/// open and writes degrade to the in-process cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request.
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// Stored data could not be decoded.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// A schema mismatch in a model response.
///
/// Warnings are logged and carried alongside the extraction; they never stop
/// normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationWarning {
    /// Offending field name.
    pub field: String,
    /// What was wrong with it.
    pub reason: String,
}

impl ValidationWarning {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
