//! Brokerage integrations.
//!
//! Defines the `Brokerage` trait and provides the Alpaca implementation.
//! The cycle only needs two operations: a fresh account snapshot and an
//! idempotent notional market buy.

pub mod alpaca;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AccountSnapshot, OrderReceipt, OrderRequest};

/// Abstraction over a brokerage execution venue.
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Fetch the current account snapshot.
    ///
    /// Called once per symbol, immediately before sizing: capacity
    /// shrinks with every submitted order, so a cached snapshot would
    /// overspend.
    async fn fetch_account(&self) -> Result<AccountSnapshot>;

    /// Submit a notional market buy (day time-in-force) and normalise
    /// the response. Errors are the underlying client's, opaque to
    /// callers.
    async fn submit_market_buy(&self, order: &OrderRequest) -> Result<OrderReceipt>;

    /// Venue name for logging and identification.
    fn name(&self) -> &str;
}
