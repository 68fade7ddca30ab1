//! Shared types for the SWEEP buy cycle.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that broker, sheets, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// An upper-cased, non-empty ticker symbol.
///
/// Can only be constructed through [`Ticker::parse`], which normalises
/// whitespace and case, so a `Ticker` in hand is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Parse a raw cell value: trim whitespace, upper-case, reject empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalised = raw.trim().to_uppercase();
        if normalised.is_empty() {
            None
        } else {
            Some(Self(normalised))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Account snapshot
// ---------------------------------------------------------------------------

/// Purchasing capacity as reported by the brokerage.
///
/// Fetched fresh immediately before each sizing decision, never cached
/// across symbols, because each submitted order reduces real capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Brokerage-reported buying power (may include margin).
    pub buying_power: Option<Decimal>,
    /// Settled cash, used when buying power is not reported.
    pub cash: Option<Decimal>,
}

impl AccountSnapshot {
    /// The capacity figure sizing runs against.
    ///
    /// Policy: prefer buying power, fall back to cash. Margin accounts
    /// report both; cash accounts may report only `cash`. An account
    /// reporting neither is an error, not a silent zero.
    pub fn purchasing_capacity(&self) -> Result<Decimal, SweepError> {
        self.buying_power
            .or(self.cash)
            .ok_or(SweepError::NoCapacity)
    }
}

impl fmt::Display for AccountSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buying_power={} cash={}",
            self.buying_power
                .map(|d| format!("${d:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            self.cash
                .map(|d| format!("${d:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Process-local sequence for idempotency keys. Two requests built in the
/// same millisecond still get distinct keys.
static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// A notional market buy, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    /// Dollar amount, not share count.
    pub notional: Decimal,
    pub extended_hours: bool,
    /// Caller-supplied idempotency key, unique per request attempt so a
    /// retried submission never double-executes at the brokerage.
    pub client_order_id: String,
}

impl OrderRequest {
    /// Build a notional market buy with a fresh idempotency key derived
    /// from the symbol, a millisecond UTC timestamp, and a sequence
    /// number.
    pub fn market_buy(symbol: &Ticker, notional: Decimal, extended_hours: bool) -> Self {
        let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed);
        let client_order_id = format!(
            "buy-{}-{}-{}",
            symbol.as_str(),
            Utc::now().timestamp_millis(),
            seq,
        );
        Self {
            symbol: symbol.as_str().to_string(),
            notional,
            extended_hours,
            client_order_id,
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BUY {} ${:.2} (ext_hours={}) [{}]",
            self.symbol, self.notional, self.extended_hours, self.client_order_id,
        )
    }
}

/// Normalised response to an order submission.
///
/// `qty` may be legitimately empty: notional orders fill asynchronously,
/// so the brokerage often has no quantity yet at submission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Brokerage order id; empty if the response omitted it.
    pub order_id: String,
    /// Brokerage status string; `"submitted"` if the response omitted it.
    pub status: String,
    /// Filled/requested quantity; empty pre-fill.
    pub qty: String,
}

impl fmt::Display for OrderReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order {} status {}", self.order_id, self.status)
    }
}

// ---------------------------------------------------------------------------
// Audit log records
// ---------------------------------------------------------------------------

/// Action column of the audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogAction {
    Buy,
    BuySkip,
    BuyError,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Buy => "BUY",
            LogAction::BuySkip => "BUY-SKIP",
            LogAction::BuyError => "BUY-ERROR",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the audit table. Exactly 8 ordered fields:
/// `Timestamp, Action, Symbol, NotionalUSD, Qty, OrderID, Status, Note`.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub action: LogAction,
    pub symbol: String,
    /// Absent on error rows, where the notional was never computed.
    pub notional: Option<Decimal>,
    pub qty: String,
    pub order_id: String,
    pub status: String,
    pub note: String,
}

impl LogRecord {
    /// A submitted buy, with qty/status/order id from the receipt.
    pub fn buy(symbol: &Ticker, notional: Decimal, receipt: &OrderReceipt) -> Self {
        Self {
            timestamp: Utc::now(),
            action: LogAction::Buy,
            symbol: symbol.as_str().to_string(),
            notional: Some(notional),
            qty: receipt.qty.clone(),
            order_id: receipt.order_id.clone(),
            status: receipt.status.clone(),
            note: String::new(),
        }
    }

    /// A below-floor skip. The too-small notional is still reported.
    pub fn skip(symbol: &Ticker, notional: Decimal, reason: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            action: LogAction::BuySkip,
            symbol: symbol.as_str().to_string(),
            notional: Some(notional),
            qty: String::new(),
            order_id: String::new(),
            status: "SKIPPED".to_string(),
            note: reason.to_string(),
        }
    }

    /// A per-symbol failure, with the error's category and message.
    pub fn error(symbol: &Ticker, note: String) -> Self {
        Self {
            timestamp: Utc::now(),
            action: LogAction::BuyError,
            symbol: symbol.as_str().to_string(),
            notional: None,
            qty: String::new(),
            order_id: String::new(),
            status: "ERROR".to_string(),
            note,
        }
    }

    /// Render as the 8 audit-table cells, in column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            self.action.to_string(),
            self.symbol.clone(),
            self.notional
                .map(|n| format!("{n:.2}"))
                .unwrap_or_default(),
            self.qty.clone(),
            self.order_id.clone(),
            self.status.clone(),
            self.note.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Per-symbol outcome
// ---------------------------------------------------------------------------

/// Which stage of the per-symbol pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Account fetch or sizing failed.
    Account,
    /// Order submission failed.
    Broker,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Account => write!(f, "AccountError"),
            ErrorCategory::Broker => write!(f, "BrokerError"),
        }
    }
}

/// Terminal state of one symbol within a cycle.
///
/// The orchestrator folds these into [`LogRecord`]s; per-symbol failure
/// is data, not control flow.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Submitted {
        notional: Decimal,
        receipt: OrderReceipt,
    },
    Skipped {
        notional: Decimal,
        reason: String,
    },
    Errored {
        category: ErrorCategory,
        message: String,
    },
}

impl SymbolOutcome {
    pub fn to_record(&self, symbol: &Ticker) -> LogRecord {
        match self {
            SymbolOutcome::Submitted { notional, receipt } => {
                LogRecord::buy(symbol, *notional, receipt)
            }
            SymbolOutcome::Skipped { notional, reason } => {
                LogRecord::skip(symbol, *notional, reason)
            }
            SymbolOutcome::Errored { category, message } => {
                LogRecord::error(symbol, format!("{category}: {message}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a single read→size→submit→log cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub symbols_seen: usize,
    pub submitted: usize,
    pub skipped: usize,
    pub errored: usize,
    /// Sum of submitted notionals.
    pub total_notional: Decimal,
}

impl CycleReport {
    /// Report for a cycle that exited early with no symbols to process.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            symbols_seen: 0,
            submitted: 0,
            skipped: 0,
            errored: 0,
            total_notional: Decimal::ZERO,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symbols={} submitted={} skipped={} errored={} committed=${:.2}",
            self.symbols_seen, self.submitted, self.skipped, self.errored, self.total_notional,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error conditions the code matches on.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("account reports neither buying power nor cash")]
    NoCapacity,

    #[error("missing credential: none of [{0}] are set")]
    MissingCredential(String),

    #[error("configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
