//! Screener ticker source.
//!
//! Reads the screener worksheet and produces the ordered, deduplicated
//! list of symbols to buy this cycle. Parsing is pure so it tests
//! without a live store.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::sheets::TableStore;
use crate::types::Ticker;

/// Header cell that marks the symbol column. Exact match after trimming.
const TICKER_HEADER: &str = "Ticker";

/// Resolves the cycle's symbol list from a screener tab.
pub struct TickerSource {
    tab: String,
}

impl TickerSource {
    pub fn new(tab: impl Into<String>) -> Self {
        Self { tab: tab.into() }
    }

    /// Read all screener rows and parse them into tickers.
    ///
    /// An empty worksheet yields an empty list, a terminal non-error
    /// condition that tells the orchestrator to exit the cycle early.
    pub async fn read(&self, store: &dyn TableStore) -> Result<Vec<Ticker>> {
        let table = store
            .open_or_create(&self.tab)
            .await
            .with_context(|| format!("Failed to open screener tab '{}'", self.tab))?;

        let rows = store
            .read_all(&table)
            .await
            .with_context(|| format!("Failed to read screener tab '{}'", self.tab))?;

        let tickers = parse_tickers(&rows);
        info!(tab = %self.tab, count = tickers.len(), "Screener tickers read");
        Ok(tickers)
    }
}

/// Index of the symbol column: the header cell whose trimmed value is
/// exactly `Ticker`, or column 0 when no such header exists.
fn ticker_column(header: &[String]) -> usize {
    header
        .iter()
        .position(|h| h.trim() == TICKER_HEADER)
        .unwrap_or(0)
}

/// Parse a header row plus data rows into an ordered, deduplicated
/// ticker list. First occurrence wins; first-seen order is preserved.
pub fn parse_tickers(rows: &[Vec<String>]) -> Vec<Ticker> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };

    let idx = ticker_column(header);
    debug!(column = idx, "Ticker column resolved");

    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();

    for row in data {
        let Some(cell) = row.get(idx) else {
            continue;
        };
        let Some(ticker) = Ticker::parse(cell) else {
            continue;
        };
        if seen.insert(ticker.clone()) {
            ordered.push(ticker);
        }
    }

    ordered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
