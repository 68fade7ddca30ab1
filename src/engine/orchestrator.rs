//! Cycle orchestrator — the read→size→submit→log state machine.
//!
//! Sequences one full cycle: resolve the screener's symbol list, then per
//! symbol fetch a fresh account snapshot, size, and submit, folding every
//! outcome into an audit record. One symbol's failure never aborts the
//! cycle; the accumulated records are written in a single batched append
//! at cycle end.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::broker::Brokerage;
use crate::config::AppConfig;
use crate::engine::sizer::{AccountSizer, SizingDecision};
use crate::journal::CycleLogger;
use crate::screener::TickerSource;
use crate::sheets::TableStore;
use crate::types::{
    CycleReport, ErrorCategory, LogRecord, OrderRequest, SymbolOutcome, Ticker,
};

// ---------------------------------------------------------------------------
// Cycle configuration
// ---------------------------------------------------------------------------

/// Immutable per-cycle settings, passed in at construction.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub screener_tab: String,
    pub log_tab: String,
    pub percent_per_trade: Decimal,
    pub min_order_notional: Decimal,
    pub sleep_between_orders: Duration,
    pub extended_hours: bool,
}

impl CycleConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            screener_tab: cfg.sheets.screener_tab.clone(),
            log_tab: cfg.sheets.log_tab.clone(),
            percent_per_trade: cfg.trading.percent_per_trade,
            min_order_notional: cfg.trading.min_order_notional,
            sleep_between_orders: cfg.trading.sleep_between_orders(),
            extended_hours: cfg.trading.extended_hours,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct CycleOrchestrator {
    broker: Box<dyn Brokerage>,
    store: Box<dyn TableStore>,
    source: TickerSource,
    logger: CycleLogger,
    sizer: AccountSizer,
    sleep_between_orders: Duration,
    extended_hours: bool,
}

impl CycleOrchestrator {
    pub fn new(broker: Box<dyn Brokerage>, store: Box<dyn TableStore>, cfg: CycleConfig) -> Self {
        Self {
            broker,
            store,
            source: TickerSource::new(cfg.screener_tab),
            logger: CycleLogger::new(cfg.log_tab),
            sizer: AccountSizer::new(cfg.percent_per_trade, cfg.min_order_notional),
            sleep_between_orders: cfg.sleep_between_orders,
            extended_hours: cfg.extended_hours,
        }
    }

    /// Run one full buy cycle.
    ///
    /// Failures before the first symbol (unreadable screener) and the
    /// final batched log write are fatal for the invocation; everything
    /// per-symbol is caught and folded into the audit records.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        info!(broker = self.broker.name(), store = self.store.name(), "Starting buy cycle");

        let tickers = self
            .source
            .read(self.store.as_ref())
            .await
            .context("Failed to read screener tickers")?;

        if tickers.is_empty() {
            info!("Screener has no tickers to buy — exiting cycle early");
            return Ok(CycleReport::empty());
        }

        let mut report = CycleReport::empty();
        report.symbols_seen = tickers.len();

        let mut records: Vec<LogRecord> = Vec::with_capacity(tickers.len());

        for symbol in &tickers {
            let outcome = self.process_symbol(symbol).await;

            match &outcome {
                SymbolOutcome::Submitted { notional, .. } => {
                    report.submitted += 1;
                    report.total_notional += *notional;
                }
                SymbolOutcome::Skipped { .. } => report.skipped += 1,
                SymbolOutcome::Errored { .. } => report.errored += 1,
            }

            let submitted = matches!(outcome, SymbolOutcome::Submitted { .. });
            records.push(outcome.to_record(symbol));

            // Throttle only after a real submission, for upstream rate limits.
            if submitted {
                tokio::time::sleep(self.sleep_between_orders).await;
            }
        }

        // Single batched write at cycle end. The schema check is deferred
        // until here so an empty screener produces zero log writes.
        let log_table = self.logger.open(self.store.as_ref()).await?;
        self.logger
            .ensure_schema(self.store.as_ref(), &log_table)
            .await?;
        self.logger
            .append(self.store.as_ref(), &log_table, &records)
            .await?;

        info!(%report, "Buy cycle complete");
        Ok(report)
    }

    /// Drive one symbol to a terminal state. Never returns an error:
    /// failures become `Errored` outcomes carrying the stage and message.
    async fn process_symbol(&self, symbol: &Ticker) -> SymbolOutcome {
        // Refresh the snapshot every symbol; each submitted order shrinks
        // real capacity.
        let snapshot = match self.broker.fetch_account().await {
            Ok(s) => s,
            Err(e) => {
                error!(%symbol, error = format!("{e:#}"), "Account fetch failed");
                return SymbolOutcome::Errored {
                    category: ErrorCategory::Account,
                    message: format!("{e:#}"),
                };
            }
        };

        let decision = match self.sizer.size(&snapshot) {
            Ok(d) => d,
            Err(e) => {
                error!(%symbol, error = %e, "Sizing failed");
                return SymbolOutcome::Errored {
                    category: ErrorCategory::Account,
                    message: e.to_string(),
                };
            }
        };

        match decision {
            SizingDecision::Skip { notional, reason } => {
                warn!(%symbol, %reason, "Skipping symbol");
                SymbolOutcome::Skipped { notional, reason }
            }
            SizingDecision::Proceed { notional } => {
                let order = OrderRequest::market_buy(symbol, notional, self.extended_hours);
                match self.broker.submit_market_buy(&order).await {
                    Ok(receipt) => {
                        info!(
                            %symbol,
                            notional = format!("${notional:.2}"),
                            order_id = %receipt.order_id,
                            status = %receipt.status,
                            "Submitted BUY"
                        );
                        SymbolOutcome::Submitted { notional, receipt }
                    }
                    Err(e) => {
                        error!(%symbol, error = format!("{e:#}"), "Order submission failed");
                        SymbolOutcome::Errored {
                            category: ErrorCategory::Broker,
                            message: format!("{e:#}"),
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
