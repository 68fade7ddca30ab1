//! Google Sheets v4 integration.
//!
//! Holds both worksheets this system touches: the screener (read) and
//! the audit log (append). All writes use `valueInputOption=RAW` so the
//! backend never locale-parses timestamps or notionals into dates.
//!
//! API docs: https://developers.google.com/sheets/api/reference/rest
//! Base URL: https://sheets.googleapis.com/v4/spreadsheets
//! Auth: `Authorization: Bearer {token}`, an operator-supplied OAuth
//! access token with the spreadsheets scope.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, info};

use super::{TableRef, TableStore};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const STORE_NAME: &str = "google-sheets";

/// Grid dimensions for tabs we create ourselves.
const NEW_TAB_ROWS: u32 = 2000;
const NEW_TAB_COLS: u32 = 50;

// ---------------------------------------------------------------------------
// API response types (Sheets JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

/// Response from `values.get`. `values` is absent for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

/// Response from `batchUpdate` with an `addSheet` request.
#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchUpdateReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateReply {
    #[serde(default)]
    add_sheet: Option<SheetEntry>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Sheets client bound to a single spreadsheet.
pub struct GoogleSheetsClient {
    http: Client,
    spreadsheet_id: String,
    token: Secret<String>,
}

impl GoogleSheetsClient {
    /// Create a client for the given spreadsheet.
    ///
    /// `token` is an OAuth bearer token; minting and refreshing it is the
    /// operator's concern, not this client's.
    pub fn new(spreadsheet_id: String, token: Secret<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("sweep/0.1.0 (buy-cycle-agent)")
            .build()
            .context("Failed to build HTTP client for Google Sheets")?;

        Ok(Self {
            http,
            spreadsheet_id,
            token,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn bearer(&self) -> &str {
        self.token.expose_secret()
    }

    /// Qualify an A1 range with the tab name: `'log'!A1:H1`.
    fn qualified_range(tab: &str, range: &str) -> String {
        format!("'{tab}'!{range}")
    }

    /// URL for a `values/...` endpoint, with the range percent-encoded.
    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{BASE_URL}/{}/values/{}{suffix}",
            self.spreadsheet_id,
            urlencoding::encode(range),
        )
    }

    /// Convert one API cell to a string. Numbers and booleans are
    /// rendered; null becomes empty.
    fn cell_to_string(cell: &serde_json::Value) -> String {
        match cell {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn rows_from(range: ValueRange) -> Vec<Vec<String>> {
        range
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.iter().map(Self::cell_to_string).collect())
            .collect()
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "");
        debug!(range, "Reading sheet values");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.bearer())
            .send()
            .await
            .context("Sheets values.get request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets values.get error {status}: {body}");
        }

        let values: ValueRange = resp
            .json()
            .await
            .context("Failed to parse Sheets values.get response")?;

        Ok(Self::rows_from(values))
    }
}

// ---------------------------------------------------------------------------
// TableStore trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl TableStore for GoogleSheetsClient {
    /// Look the tab up in the spreadsheet metadata; add it when missing.
    async fn open_or_create(&self, tab: &str) -> Result<TableRef> {
        let url = format!(
            "{BASE_URL}/{}?fields=sheets.properties",
            self.spreadsheet_id
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.bearer())
            .send()
            .await
            .context("Sheets metadata request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets metadata error {status}: {body}");
        }

        let meta: SpreadsheetMeta = resp
            .json()
            .await
            .context("Failed to parse Sheets metadata response")?;

        if let Some(entry) = meta.sheets.iter().find(|s| s.properties.title == tab) {
            return Ok(TableRef {
                tab: tab.to_string(),
                sheet_id: entry.properties.sheet_id,
            });
        }

        info!(tab, "Worksheet not found — creating");

        let body = serde_json::json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": tab,
                        "gridProperties": {
                            "rowCount": NEW_TAB_ROWS,
                            "columnCount": NEW_TAB_COLS,
                        },
                    },
                },
            }],
        });

        let resp = self
            .http
            .post(&format!("{BASE_URL}/{}:batchUpdate", self.spreadsheet_id))
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .context("Sheets addSheet request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets addSheet error {status}: {body}");
        }

        let reply: BatchUpdateResponse = resp
            .json()
            .await
            .context("Failed to parse Sheets addSheet response")?;

        let sheet_id = reply
            .replies
            .first()
            .and_then(|r| r.add_sheet.as_ref())
            .map(|s| s.properties.sheet_id)
            .context("Sheets addSheet response missing sheet properties")?;

        Ok(TableRef {
            tab: tab.to_string(),
            sheet_id,
        })
    }

    async fn read_all(&self, table: &TableRef) -> Result<Vec<Vec<String>>> {
        // A bare quoted tab name reads the whole populated grid.
        self.get_values(&format!("'{}'", table.tab)).await
    }

    async fn read_range(&self, table: &TableRef, range: &str) -> Result<Vec<Vec<String>>> {
        self.get_values(&Self::qualified_range(&table.tab, range))
            .await
    }

    async fn update_range(
        &self,
        table: &TableRef,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let qualified = Self::qualified_range(&table.tab, range);
        let url = self.values_url(&qualified, "?valueInputOption=RAW");

        let body = serde_json::json!({
            "range": qualified,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let resp = self
            .http
            .put(&url)
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .context("Sheets values.update request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets values.update error {status}: {body}");
        }

        debug!(range = %qualified, rows = rows.len(), "Range updated");
        Ok(())
    }

    async fn append_rows(
        &self,
        table: &TableRef,
        table_range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let qualified = Self::qualified_range(&table.tab, table_range);
        let url = self.values_url(
            &qualified,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );

        let body = serde_json::json!({ "values": rows });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .context("Sheets values.append request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets values.append error {status}: {body}");
        }

        debug!(anchor = %qualified, rows = rows.len(), "Rows appended");
        Ok(())
    }

    async fn freeze_rows(&self, table: &TableRef, row_count: u32) -> Result<()> {
        let body = serde_json::json!({
            "requests": [{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": table.sheet_id,
                        "gridProperties": { "frozenRowCount": row_count },
                    },
                    "fields": "gridProperties.frozenRowCount",
                },
            }],
        });

        let resp = self
            .http
            .post(&format!("{BASE_URL}/{}:batchUpdate", self.spreadsheet_id))
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .context("Sheets freeze request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Sheets freeze error {status}: {body}");
        }

        Ok(())
    }

    fn supports_anchored_append(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        STORE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
