use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use rcpt_core::sheet::{COLUMN_COUNT, headers};
use rcpt_core::{
    Actor, BackendError, Cell, Column, DocumentPipeline, ExtractionClient, FixedClock, Generation,
    InboundDocument, MemoryFileStore, MemoryRowStore, MemoryTenantDirectory, MemoryUsageStore,
    PipelineError, RetryPolicy, ScriptedBackend, TenantLedger, TenantRecord, UsageLedger,
};

const SPA_RECEIPT: &str = r#"```json
{
  "documentType": "tax invoice",
  "invoiceNumber": "IV6901-0042",
  "invoiceDate": "11/01/2569",
  "sellerName": "Siam Spa Co., Ltd.",
  "sellerTaxId": "010-756-6000-453",
  "expenseCategory": "other",
  "lineItems": [
    {"lineType": "item", "description": "Massage 60 min", "quantity": 1, "amount": "1,200.00"},
    {"lineType": "discount", "description": "ส่วนลด 10%", "amount": -120}
  ],
  "vatAmount": 70.65,
  "grandTotal": "฿1,080.00",
  "confidence": 0.93
}
```"#;

fn noon(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn document() -> InboundDocument {
    InboundDocument {
        bytes: b"\xff\xd8jpeg".to_vec(),
        file_name: "receipt.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        actor: Actor::new("U42", "Malee"),
        tenant_id: None,
    }
}

struct Harness {
    pipeline: DocumentPipeline,
    backend: Arc<ScriptedBackend>,
    rows: Arc<MemoryRowStore>,
    files: Arc<MemoryFileStore>,
    usage: Arc<MemoryUsageStore>,
}

fn harness(backend: ScriptedBackend, limit: u64, files: MemoryFileStore) -> Harness {
    let backend = Arc::new(backend);
    let rows = Arc::new(MemoryRowStore::new());
    let files = Arc::new(files);
    let usage = Arc::new(MemoryUsageStore::new());
    let clock = Arc::new(FixedClock::new(noon(12)));

    let client = ExtractionClient::new(
        backend.clone(),
        &["primary".to_string(), "fallback".to_string()],
        RetryPolicy::default(),
    );
    let ledger = UsageLedger::new(usage.clone(), clock.clone(), limit);
    let pipeline = DocumentPipeline::new(client, ledger, rows.clone(), files.clone()).with_clock(clock);

    Harness {
        pipeline,
        backend,
        rows,
        files,
        usage,
    }
}

#[tokio::test]
async fn processes_receipt_into_rows() {
    let h = harness(
        ScriptedBackend::new([Ok(Generation::new(SPA_RECEIPT).with_tokens(1536))]),
        450,
        MemoryFileStore::new(),
    );

    let processed = h.pipeline.process(document()).await.unwrap();

    assert_eq!(processed.receipt_id, "R260112-001");
    assert_eq!(processed.rows_appended, 2);
    assert_eq!(processed.used, 1);
    assert_eq!(processed.image_url, "memory://2026-01-12/receipt.jpg");
    assert_eq!(processed.invoice.invoice_date.as_deref(), Some("2026-01-11"));
    assert_eq!(processed.invoice.seller_tax_id.as_deref(), Some("0107566000453"));
    assert!(processed.reply().contains("R260112-001"));

    assert_eq!(h.rows.header(), headers());
    let rows = h.rows.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.len() == COLUMN_COUNT));
    assert_eq!(rows[0].get(Column::InvoiceMonth), &Cell::text("202601"));
    assert_eq!(rows[0].get(Column::AdditionalVat).to_string(), "84.00");
    assert_eq!(rows[1].get(Column::AdditionalVat), &Cell::Empty);
    assert_eq!(rows[1].get(Column::TokenUsed).to_string(), "1536");
    assert_eq!(rows[1].get(Column::UserId), &Cell::text("U42"));

    assert_eq!(h.usage.count("202601"), Some(1));
    assert_eq!(h.files.documents().len(), 1);
}

#[tokio::test]
async fn second_document_reuses_header_and_advances_receipt_id() {
    let h = harness(ScriptedBackend::repeating(SPA_RECEIPT, 2), 450, MemoryFileStore::new());

    h.pipeline.process(document()).await.unwrap();
    let second = h.pipeline.process(document()).await.unwrap();

    assert_eq!(second.receipt_id, "R260112-002");
    assert_eq!(second.used, 2);
    assert_eq!(h.rows.rows().len(), 4);
}

#[tokio::test]
async fn quota_exceeded_never_calls_backend() {
    let h = harness(ScriptedBackend::repeating(SPA_RECEIPT, 1), 1, MemoryFileStore::new());
    h.usage.insert("202601", 1);

    let err = h.pipeline.process(document()).await.unwrap_err();

    assert!(matches!(err, PipelineError::QuotaExceeded(ref a) if a.used == 1 && a.limit == 1));
    assert!(err.user_message().contains("1/1"));
    assert!(h.backend.calls().is_empty());
    assert!(h.files.documents().is_empty());
    assert!(h.rows.rows().is_empty());
}

#[tokio::test]
async fn failed_extraction_is_not_counted() {
    let h = harness(
        ScriptedBackend::new([Err(BackendError::Other("502 bad gateway".to_string()))]),
        450,
        MemoryFileStore::new(),
    );

    let err = h.pipeline.process(document()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(_)));
    assert!(!err.user_message().contains("502"));
    assert_eq!(h.usage.count("202601"), None);
    assert!(h.rows.rows().is_empty());
}

#[tokio::test]
async fn failed_upload_degrades_to_blank_url() {
    let h = harness(ScriptedBackend::repeating(SPA_RECEIPT, 1), 450, MemoryFileStore::failing());

    let processed = h.pipeline.process(document()).await.unwrap();

    assert_eq!(processed.image_url, "");
    assert_eq!(h.rows.rows()[0].get(Column::ImageUrl), &Cell::Empty);
}

#[tokio::test]
async fn usage_store_outage_fails_open() {
    let h = harness(ScriptedBackend::repeating(SPA_RECEIPT, 1), 450, MemoryFileStore::new());
    h.usage.set_failing(true);

    let processed = h.pipeline.process(document()).await.unwrap();

    assert_eq!(processed.used, 1);
    assert_eq!(h.rows.rows().len(), 2);
}

#[tokio::test]
async fn tenant_quota_gates_and_counts() {
    let backend = Arc::new(ScriptedBackend::repeating(SPA_RECEIPT, 2));
    let rows = Arc::new(MemoryRowStore::new());
    let clock = Arc::new(FixedClock::new(noon(12)));
    let directory = Arc::new(MemoryTenantDirectory::new());
    directory.insert(TenantRecord::new("spa-01", 1));

    let client = ExtractionClient::new(backend.clone(), &["primary".to_string()], RetryPolicy::default());
    let ledger = UsageLedger::new(Arc::new(MemoryUsageStore::new()), clock.clone(), 450);
    let pipeline = DocumentPipeline::new(client, ledger, rows, Arc::new(MemoryFileStore::new()))
        .with_clock(clock)
        .with_tenants(TenantLedger::new(directory.clone(), 100));

    let mut doc = document();
    doc.tenant_id = Some("spa-01".to_string());

    pipeline.process(doc.clone()).await.unwrap();
    assert_eq!(directory.tenant("spa-01").unwrap().used, 1);

    let err = pipeline.process(doc.clone()).await.unwrap_err();
    assert!(matches!(err, PipelineError::QuotaExceeded(_)));
    assert_eq!(backend.calls().len(), 1);

    doc.tenant_id = Some("stranger".to_string());
    let err = pipeline.process(doc).await.unwrap_err();
    assert!(err.user_message().contains("stranger"));
}
