//! Document file storage.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::StoreError;

/// A stored copy of an inbound document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
}

/// Remote storage for original document images and PDFs.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload_document(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder: &str,
    ) -> Result<UploadedFile, StoreError>;
}

/// Date-bucketed folder for a processing time, one per calendar day.
pub fn date_folder(processed_at: NaiveDateTime) -> String {
    processed_at.format("%Y-%m-%d").to_string()
}

/// A document held by [`MemoryFileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub folder: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

/// File store kept in process memory; URLs use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    documents: Mutex<Vec<StoredDocument>>,
    fail: bool,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every upload.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn upload_document(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        folder: &str,
    ) -> Result<UploadedFile, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("upload rejected".to_string()));
        }

        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(StoredDocument {
                folder: folder.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                size: bytes.len(),
            });

        Ok(UploadedFile {
            url: format!("memory://{}/{}", folder, name),
        })
    }
}
