//! End-to-end handling of one inbound document.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::{ExtractionError, StoreError, ValidationWarning};
use crate::extraction::ExtractionClient;
use crate::models::invoice::Invoice;
use crate::sheet::{Actor, RowStore, SheetRowProjector, ensure_header};
use crate::upload::{FileStore, date_folder};
use crate::usage::{Availability, Clock, SystemClock, TenantLedger, UsageLedger};

/// A document delivered by the chat transport.
#[derive(Debug, Clone)]
pub struct InboundDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub actor: Actor,
    /// Tenant the sender belongs to, when tenant quotas are in use.
    pub tenant_id: Option<String>,
}

/// Result of a processed document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub receipt_id: String,
    pub invoice: Invoice,
    pub model: String,
    /// Empty when the upload failed.
    pub image_url: String,
    pub rows_appended: usize,
    /// Monthly count after this document.
    pub used: u64,
    pub limit: u64,
    pub warnings: Vec<ValidationWarning>,
}

impl ProcessedDocument {
    /// Reply text for the sender.
    pub fn reply(&self) -> String {
        let mut reply = format!(
            "Saved {} ({}): {} item(s), total {}.",
            self.receipt_id,
            self.invoice.document_type.as_str(),
            self.invoice.line_items.len(),
            self.invoice.grand_total
        );
        for note in self.invoice.review_notes() {
            reply.push_str("\n- ");
            reply.push_str(&note);
        }
        reply.push_str(&format!("\nUsage this month: {}/{}", self.used, self.limit));
        reply
    }
}

/// Why a document was not recorded.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("quota exceeded: {}/{}", .0.used, .0.limit)]
    QuotaExceeded(Availability),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Text that may be shown to the sender. Provider error text is reduced
    /// to a short diagnostic.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::QuotaExceeded(availability) => availability
                .message
                .clone()
                .unwrap_or_else(|| "Monthly quota reached.".to_string()),
            PipelineError::Extraction(err) => format!(
                "Sorry, this document could not be read ({}). Please try again in a few minutes.",
                err.summary()
            ),
            PipelineError::Store(_) => {
                "Sorry, the document was read but could not be saved. Please try again.".to_string()
            }
        }
    }
}

/// Quota check, upload, extraction, accounting and sheet append for one
/// document at a time. Shared across tasks through `Arc`.
pub struct DocumentPipeline {
    extraction: ExtractionClient,
    ledger: UsageLedger,
    tenants: Option<TenantLedger>,
    projector: SheetRowProjector,
    rows: Arc<dyn RowStore>,
    files: Arc<dyn FileStore>,
    clock: Arc<dyn Clock>,
}

impl DocumentPipeline {
    pub fn new(
        extraction: ExtractionClient,
        ledger: UsageLedger,
        rows: Arc<dyn RowStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            extraction,
            ledger,
            tenants: None,
            projector: SheetRowProjector::new(),
            rows,
            files,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_tenants(mut self, tenants: TenantLedger) -> Self {
        self.tenants = Some(tenants);
        self
    }

    pub fn with_projector(mut self, projector: SheetRowProjector) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Process one document.
    ///
    /// Usage is counted only after a successful extraction. A failed upload
    /// is logged and the rows are written with a blank image URL.
    pub async fn process(&self, document: InboundDocument) -> Result<ProcessedDocument, PipelineError> {
        let availability = self.ledger.check_availability().await;
        if !availability.allowed {
            info!(used = availability.used, limit = availability.limit, "Monthly quota reached");
            return Err(PipelineError::QuotaExceeded(availability));
        }

        if let (Some(tenants), Some(tenant_id)) = (&self.tenants, &document.tenant_id) {
            let tenant = tenants.check_availability(tenant_id).await;
            if !tenant.allowed {
                info!(tenant = %tenant_id, used = tenant.used, limit = tenant.limit, "Tenant quota reached");
                return Err(PipelineError::QuotaExceeded(tenant));
            }
        }

        let processed_at = self.clock.now();

        let image_url = match self
            .files
            .upload_document(
                &document.bytes,
                &document.file_name,
                &document.mime_type,
                &date_folder(processed_at),
            )
            .await
        {
            Ok(file) => file.url,
            Err(err) => {
                warn!(file = %document.file_name, error = %err, "Upload failed, continuing without image URL");
                String::new()
            }
        };

        let extraction = self
            .extraction
            .extract(&document.bytes, &document.mime_type)
            .await?;

        let used = self.ledger.increment().await;
        if let (Some(tenants), Some(tenant_id)) = (&self.tenants, &document.tenant_id) {
            tenants.increment(tenant_id).await;
        }

        let projection = self.projector.project(
            &extraction.invoice,
            &image_url,
            processed_at,
            &document.actor,
        );

        ensure_header(self.rows.as_ref()).await?;
        self.rows.append_rows(&projection.rows).await?;

        info!(
            receipt_id = %projection.receipt_id,
            rows = projection.rows.len(),
            model = %extraction.model,
            "Rows appended"
        );

        Ok(ProcessedDocument {
            receipt_id: projection.receipt_id,
            rows_appended: projection.rows.len(),
            invoice: extraction.invoice,
            model: extraction.model,
            image_url,
            used,
            limit: self.ledger.limit(),
            warnings: extraction.warnings,
        })
    }
}
