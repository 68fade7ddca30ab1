//! Account-percentage order sizing.
//!
//! Converts a fresh account snapshot into a per-symbol notional, or a
//! skip when the result lands below the configured floor. The sizer is
//! pure; the orchestrator owns snapshot freshness.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{AccountSnapshot, SweepError};

/// Outcome of sizing one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SizingDecision {
    /// Submit an order for this notional.
    Proceed { notional: Decimal },
    /// Below the floor; don't submit. The reason lands in the log's
    /// `Note` column, the notional in `NotionalUSD`.
    Skip { notional: Decimal, reason: String },
}

/// Sizes orders as a fixed percentage of current purchasing capacity.
#[derive(Debug, Clone)]
pub struct AccountSizer {
    percent_per_trade: Decimal,
    min_order_notional: Decimal,
}

impl AccountSizer {
    pub fn new(percent_per_trade: Decimal, min_order_notional: Decimal) -> Self {
        Self {
            percent_per_trade,
            min_order_notional,
        }
    }

    /// `notional = capacity * (percent / 100)`, rounded to cents.
    ///
    /// The snapshot must have been fetched immediately before this call:
    /// sizing against a stale capacity figure overspends once earlier
    /// orders in the cycle have consumed part of it.
    pub fn size(&self, snapshot: &AccountSnapshot) -> Result<SizingDecision, SweepError> {
        let capacity = snapshot.purchasing_capacity()?;
        let notional = (capacity * self.percent_per_trade / dec!(100)).round_dp(2);

        if notional < self.min_order_notional {
            Ok(SizingDecision::Skip {
                notional,
                reason: format!(
                    "Notional {notional:.2} < min order notional {:.2}",
                    self.min_order_notional,
                ),
            })
        } else {
            Ok(SizingDecision::Proceed { notional })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
