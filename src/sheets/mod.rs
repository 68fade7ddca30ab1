//! Tabular storage collaborators.
//!
//! Defines the `TableStore` trait, the seam between the buy cycle and
//! whatever worksheet backend holds the screener and the audit log,
//! and provides the Google Sheets implementation.

pub mod google;

use anyhow::Result;
use async_trait::async_trait;

/// Handle to a single worksheet (tab) within the configured spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub tab: String,
    /// Backend-assigned sheet id, needed for structural requests.
    pub sheet_id: i64,
}

/// Abstraction over a worksheet-holding tabular backend.
///
/// Ranges are A1 notation relative to the worksheet (`"A1:H1"`); the
/// implementation qualifies them with the tab name.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Open the named tab, creating it if it doesn't exist.
    async fn open_or_create(&self, tab: &str) -> Result<TableRef>;

    /// All populated rows of the worksheet, as strings.
    async fn read_all(&self, table: &TableRef) -> Result<Vec<Vec<String>>>;

    /// Rows within an A1 range.
    async fn read_range(&self, table: &TableRef, range: &str) -> Result<Vec<Vec<String>>>;

    /// Overwrite an A1 range with the given rows, raw (no auto-parsing).
    async fn update_range(&self, table: &TableRef, range: &str, rows: &[Vec<String>])
        -> Result<()>;

    /// Append rows below the table anchored at `table_range`, raw.
    ///
    /// Anchoring keeps appends attached to the declared table so the
    /// backend's auto-formatting never starts a second, misaligned region.
    async fn append_rows(&self, table: &TableRef, table_range: &str, rows: &[Vec<String>])
        -> Result<()>;

    /// Freeze the first `row_count` rows of the worksheet.
    async fn freeze_rows(&self, table: &TableRef, row_count: u32) -> Result<()>;

    /// Whether `append_rows` honours range anchoring. Backends that don't
    /// are served by the logger's row-count fallback path.
    fn supports_anchored_append(&self) -> bool {
        true
    }

    /// Backend name for logging and identification.
    fn name(&self) -> &str;
}
