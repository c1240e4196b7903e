//! Core library for receipt and tax-invoice extraction.
//!
//! This crate provides:
//! - Tolerant normalization of model-generated invoice JSON (amounts, Thai tax IDs, dates)
//! - Projection of invoices onto a fixed 24-column expense sheet
//! - Monthly and per-tenant usage ledgers that fail open
//! - A vision-model extraction client with model fallback and rate-limit backoff
//! - A document pipeline wiring these to row, file and usage stores

pub mod error;
pub mod extraction;
pub mod invoice;
pub mod models;
pub mod pipeline;
pub mod sheet;
pub mod upload;
pub mod usage;

pub use error::{ExtractionError, RcptError, Result, StoreError, ValidationWarning};
pub use extraction::{
    BackendError, Extraction, ExtractionBackend, ExtractionClient, GenerateRequest, Generation,
    RetryPolicy, ScriptedBackend, Step,
};
pub use invoice::InvoiceNormalizer;
pub use models::config::RcptConfig;
pub use models::invoice::{DocumentType, ExpenseCategory, Invoice, LineItem, LineType};
pub use models::raw::RawExtraction;
pub use pipeline::{DocumentPipeline, InboundDocument, PipelineError, ProcessedDocument};
pub use sheet::{
    Actor, Cell, Column, HeaderStatus, MemoryRowStore, Projection, RowStore, SheetRow,
    SheetRowProjector,
};
pub use upload::{FileStore, MemoryFileStore, UploadedFile};
pub use usage::{
    Availability, Clock, FixedClock, JsonFileUsageStore, MemoryTenantDirectory, MemoryUsageStore,
    SystemClock, TenantDirectory, TenantLedger, TenantRecord, UsageLedger, UsageStore,
};
