//! In-memory row store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;

use super::{RowStore, SheetRow};

/// Row store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    header: Mutex<Vec<String>>,
    rows: Mutex<Vec<SheetRow>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose sheet already has a header row.
    pub fn with_header(header: &[&str]) -> Self {
        Self {
            header: Mutex::new(header.iter().map(|h| h.to_string()).collect()),
            rows: Mutex::default(),
        }
    }

    pub fn header(&self) -> Vec<String> {
        self.header.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(rows);
        Ok(())
    }

    async fn header_row(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.header())
    }

    async fn set_header_row(&self, headers: &[&str]) -> Result<(), StoreError> {
        *self.header.lock().unwrap_or_else(|e| e.into_inner()) =
            headers.iter().map(|h| h.to_string()).collect();
        Ok(())
    }
}
