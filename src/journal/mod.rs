//! Audit journal.
//!
//! Appends cycle outcomes to a fixed-width log table. The schema is the
//! invariant: exactly 8 columns, header anchored at `A1:H1`, every row
//! padded or truncated to width before it is written. Batch appends are
//! anchored to the header range so the backend's auto-formatting never
//! starts a second, misaligned table region.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::sheets::{TableRef, TableStore};
use crate::types::LogRecord;

/// The audit table header, in column order.
pub const LOG_HEADERS: [&str; 8] = [
    "Timestamp",
    "Action",
    "Symbol",
    "NotionalUSD",
    "Qty",
    "OrderID",
    "Status",
    "Note",
];

/// A1 range the header occupies; appends anchor here.
pub const LOG_TABLE_RANGE: &str = "A1:H1";

/// Rows per batched append call.
const APPEND_CHUNK_ROWS: usize = 100;

/// Writes cycle outcome rows to the audit tab.
pub struct CycleLogger {
    tab: String,
}

impl CycleLogger {
    pub fn new(tab: impl Into<String>) -> Self {
        Self { tab: tab.into() }
    }

    /// Open (or create) the audit tab.
    pub async fn open(&self, store: &dyn TableStore) -> Result<TableRef> {
        store
            .open_or_create(&self.tab)
            .await
            .with_context(|| format!("Failed to open log tab '{}'", self.tab))
    }

    /// Ensure the header row is exactly in `A1:H1`, then freeze it.
    ///
    /// The header is only rewritten when it differs, so repeated calls
    /// leave a correct table untouched. Freezing is best-effort: a
    /// failure is logged and swallowed, never fatal.
    pub async fn ensure_schema(&self, store: &dyn TableStore, table: &TableRef) -> Result<()> {
        let current = store
            .read_range(table, LOG_TABLE_RANGE)
            .await
            .context("Failed to read log header row")?;

        let header_ok = current
            .first()
            .map(|row| row.iter().map(String::as_str).eq(LOG_HEADERS))
            .unwrap_or(false);

        if !header_ok {
            info!(tab = %self.tab, "Writing audit table header");
            store
                .update_range(table, LOG_TABLE_RANGE, &[header_row()])
                .await
                .context("Failed to write log header row")?;
        }

        if let Err(e) = store.freeze_rows(table, 1).await {
            warn!(tab = %self.tab, error = %e, "Could not freeze header row");
        }

        Ok(())
    }

    /// Append records below the header, at most 100 rows per call.
    ///
    /// Every row is normalised to exactly 8 cells first. Stores without
    /// anchored append get a single contiguous block computed from the
    /// current row count instead: equivalent, but not gap-safe under
    /// concurrent writers (none exist in this design).
    pub async fn append(
        &self,
        store: &dyn TableStore,
        table: &TableRef,
        records: &[LogRecord],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| normalize_row(r.to_row()))
            .collect();

        if store.supports_anchored_append() {
            for chunk in rows.chunks(APPEND_CHUNK_ROWS) {
                store
                    .append_rows(table, LOG_TABLE_RANGE, chunk)
                    .await
                    .context("Failed to append log rows")?;
            }
        } else {
            let start = store
                .read_all(table)
                .await
                .context("Failed to count log rows for fallback append")?
                .len()
                + 1;
            let end = start + rows.len() - 1;
            store
                .update_range(table, &format!("A{start}:H{end}"), &rows)
                .await
                .context("Failed to write log rows (fallback)")?;
        }

        info!(tab = %self.tab, rows = rows.len(), "Audit rows appended");
        Ok(())
    }
}

fn header_row() -> Vec<String> {
    LOG_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Force a row to exactly 8 cells, padding with empties or truncating.
fn normalize_row(mut row: Vec<String>) -> Vec<String> {
    row.resize(LOG_HEADERS.len(), String::new());
    row
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
