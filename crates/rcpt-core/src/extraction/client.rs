//! Extraction client: walks the model chain under the retry policy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::ExtractionError;
use crate::invoice::InvoiceNormalizer;
use crate::models::config::RcptConfig;

use super::prompt::extraction_prompt;
use super::response::{parse_response, validate};
use super::{Extraction, ExtractionBackend, GenerateRequest, Generation, RetryPolicy, Step};

/// Ordered model list with blanks and repeats removed.
pub fn dedup_models<'a>(models: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    for model in models {
        let model = model.trim();
        if !model.is_empty() && !chain.iter().any(|m| m == model) {
            chain.push(model.to_string());
        }
    }
    chain
}

/// Bound on a single model call unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Turns document bytes into a canonical invoice using a vision model.
pub struct ExtractionClient {
    backend: Arc<dyn ExtractionBackend>,
    models: Vec<String>,
    policy: RetryPolicy,
    request_timeout: Duration,
    normalizer: InvoiceNormalizer,
    prompt: String,
}

impl ExtractionClient {
    pub fn new(backend: Arc<dyn ExtractionBackend>, models: &[String], policy: RetryPolicy) -> Self {
        Self {
            backend,
            models: dedup_models(models.iter().map(String::as_str)),
            policy,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            normalizer: InvoiceNormalizer::new(),
            prompt: extraction_prompt(),
        }
    }

    pub fn from_config(backend: Arc<dyn ExtractionBackend>, config: &RcptConfig) -> Self {
        Self::new(backend, &config.model_chain(), config.retry_policy())
            .with_request_timeout(config.request_timeout())
    }

    /// Longest a single model call may take. A call that runs over is a
    /// fatal error for the whole extraction.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Models in the order they are tried.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Extract an invoice from a document image or PDF.
    ///
    /// Rate limits back off and retry the same model; an unavailable model
    /// moves on to the next one. Any other failure, including an unreadable
    /// answer, stops immediately. When the chain runs out the last error is
    /// returned.
    pub async fn extract(&self, document: &[u8], mime_type: &str) -> Result<Extraction, ExtractionError> {
        if self.models.is_empty() {
            return Err(ExtractionError::EmptyModelChain);
        }

        let mut last_error = None;

        'models: for model in &self.models {
            let mut attempt = 0;
            loop {
                info!(model = %model, attempt, "Calling extraction model");

                let request = GenerateRequest {
                    prompt: &self.prompt,
                    image: document,
                    mime_type,
                    model,
                };

                let call = self.backend.generate(request);
                let err = match tokio::time::timeout(self.request_timeout, call).await {
                    Ok(Ok(generation)) => return self.finish(model, generation),
                    Ok(Err(e)) => e.into_extraction_error(model),
                    Err(_) => ExtractionError::Fatal {
                        model: model.clone(),
                        message: format!("no answer within {} s", self.request_timeout.as_secs()),
                    },
                };

                match self.policy.next_step(&err, attempt) {
                    Step::Retry(delay) => {
                        warn!(model = %model, attempt, delay_ms = delay.as_millis() as u64, "Rate limited, backing off");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Step::SwitchModel => {
                        warn!(model = %model, error = %err, "Switching to next model");
                        last_error = Some(err);
                        continue 'models;
                    }
                    Step::Abort => {
                        error!(model = %model, error = %err, "Extraction failed");
                        return Err(err);
                    }
                }
            }
        }

        let err = last_error.unwrap_or(ExtractionError::EmptyModelChain);
        error!(error = %err, "All extraction models exhausted");
        Err(err)
    }

    fn finish(&self, model: &str, generation: Generation) -> Result<Extraction, ExtractionError> {
        let raw = parse_response(&generation.text).inspect_err(|err| {
            error!(model = %model, error = %err, "Unreadable model response");
        })?;

        let warnings = validate(&raw);
        for warning in &warnings {
            warn!(model = %model, field = %warning.field, reason = %warning.reason, "Model response failed validation");
        }

        let invoice = self
            .normalizer
            .normalize_with_tokens(&raw, generation.tokens_used);

        info!(
            model = %model,
            items = invoice.line_items.len(),
            tokens = generation.tokens_used,
            "Extracted invoice"
        );

        Ok(Extraction {
            invoice,
            model: model.to_string(),
            warnings,
        })
    }
}
