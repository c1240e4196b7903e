//! Vision-model extraction with model fallback and retry.

mod client;
pub mod prompt;
pub mod response;
mod retry;

pub use client::{ExtractionClient, dedup_models};
pub use retry::{RetryPolicy, Step};

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{ExtractionError, ValidationWarning};
use crate::models::invoice::Invoice;

/// Failure reported by an extraction backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 429-class rejection.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 404-class: the model is not served.
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Classify for the retry policy.
    pub fn into_extraction_error(self, model: &str) -> ExtractionError {
        let model = model.to_string();
        match self {
            BackendError::RateLimited(message) => ExtractionError::RateLimited { model, message },
            BackendError::NotFound(message) => ExtractionError::ModelUnavailable { model, message },
            BackendError::Other(message) => ExtractionError::Fatal { model, message },
        }
    }
}

/// One call to a vision model.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub image: &'a [u8],
    pub mime_type: &'a str,
    pub model: &'a str,
}

/// Model answer with token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
    pub text: String,
    pub tokens_used: Option<u64>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// A vision-language model service that can serve several named models.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<Generation, BackendError>;
}

/// Successful extraction of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub invoice: Invoice,
    /// Model that produced the answer.
    pub model: String,
    /// Schema problems found in the answer; informational only.
    pub warnings: Vec<ValidationWarning>,
}

/// Backend that replays a queue of canned answers and records which models
/// were called. Runs dry with [`BackendError::Other`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<Generation, BackendError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Result<Generation, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    /// Backend answering every call with the same text.
    pub fn repeating(text: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(Generation::new(text))))
    }

    /// Models called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ExtractionBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<Generation, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.model.to_string());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Other("script exhausted".to_string())))
    }
}
