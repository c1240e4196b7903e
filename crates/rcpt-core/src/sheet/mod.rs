//! Spreadsheet projection module.

mod projector;
pub mod schema;
mod store;

pub use projector::{Projection, ReceiptIdGenerator, SheetRowProjector};
pub use schema::{COLUMN_COUNT, Column, headers};
pub use store::MemoryRowStore;

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::error::StoreError;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Decimal),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Text cell, or blank when absent or empty.
    pub fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Cell::Text(v.to_string()),
            _ => Cell::Empty,
        }
    }

    pub fn opt_number(value: Option<Decimal>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Empty => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) => Serialize::serialize(n, serializer),
            Cell::Empty => serializer.serialize_str(""),
        }
    }
}

/// One row of the expense sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SheetRow(Vec<Cell>);

impl SheetRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cell for a column. Rows built by the projector always have every column.
    pub fn get(&self, column: Column) -> &Cell {
        self.0.get(column.index()).unwrap_or(&Cell::Empty)
    }

    /// Cells rendered as plain strings, for CSV output.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|c| c.to_string()).collect()
    }
}

/// The chat user a document was received from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Append-only row storage backing the expense sheet.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Append rows after the last used row.
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError>;

    /// Current header row; empty when the sheet has none.
    async fn header_row(&self) -> Result<Vec<String>, StoreError>;

    /// Overwrite the header row.
    async fn set_header_row(&self, headers: &[&str]) -> Result<(), StoreError>;
}

/// Outcome of [`ensure_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    Written,
    Present,
    Mismatch,
}

/// Write the header row into an empty sheet.
///
/// A header that differs from the current layout is left untouched; use
/// [`migrate_header`] to replace it.
pub async fn ensure_header(store: &dyn RowStore) -> Result<HeaderStatus, StoreError> {
    let expected = headers();
    let current = store.header_row().await?;

    if current.iter().all(|h| h.trim().is_empty()) {
        store.set_header_row(&expected).await?;
        info!(columns = expected.len(), "Wrote sheet header row");
        return Ok(HeaderStatus::Written);
    }

    if current.iter().map(String::as_str).eq(expected.iter().copied()) {
        Ok(HeaderStatus::Present)
    } else {
        warn!(
            found = current.len(),
            expected = expected.len(),
            "Sheet header differs from the current layout, leaving it unchanged"
        );
        Ok(HeaderStatus::Mismatch)
    }
}

/// Overwrite the header row with the current layout.
pub async fn migrate_header(store: &dyn RowStore) -> Result<(), StoreError> {
    let expected = headers();
    store.set_header_row(&expected).await?;
    info!(columns = expected.len(), "Migrated sheet header row");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::text("abc").to_string(), "abc");
        assert_eq!(Cell::Number(Decimal::new(10800, 1)).to_string(), "1080.0");
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::opt_text(Some("")), Cell::Empty);
        assert_eq!(Cell::opt_number(None), Cell::Empty);
    }

    #[test]
    fn test_row_serializes_as_array() {
        let row = SheetRow::new(vec![Cell::text("R260111-001"), Cell::Number(Decimal::ONE), Cell::Empty]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!(["R260111-001", "1", ""]));
    }

    #[test]
    fn test_number_cell_keeps_scale() {
        let json = serde_json::to_string(&Cell::Number(Decimal::new(697, 2))).unwrap();
        assert_eq!(json, "\"6.97\"");
    }

    #[tokio::test]
    async fn test_ensure_header_writes_once() {
        let store = MemoryRowStore::new();

        assert_eq!(ensure_header(&store).await.unwrap(), HeaderStatus::Written);
        assert_eq!(ensure_header(&store).await.unwrap(), HeaderStatus::Present);
        assert_eq!(store.header(), headers());
    }

    #[tokio::test]
    async fn test_ensure_header_leaves_mismatch() {
        let store = MemoryRowStore::with_header(&["Date", "Amount"]);

        assert_eq!(ensure_header(&store).await.unwrap(), HeaderStatus::Mismatch);
        assert_eq!(store.header(), vec!["Date", "Amount"]);

        migrate_header(&store).await.unwrap();
        assert_eq!(store.header(), headers());
    }
}
