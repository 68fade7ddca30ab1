//! In-memory `Brokerage` for integration testing.
//!
//! Tracks a live buying-power figure that shrinks with every accepted
//! order, so tests observe the same capacity decay a real account shows
//! within one cycle. Clones share state.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use sweep::broker::Brokerage;
use sweep::types::{AccountSnapshot, OrderReceipt, OrderRequest};

#[derive(Clone)]
pub struct MockBroker {
    buying_power: Arc<Mutex<Decimal>>,
    /// Symbols whose submission fails with a simulated rejection.
    fail_symbols: Arc<HashSet<String>>,
    submitted: Arc<Mutex<Vec<OrderRequest>>>,
    account_calls: Arc<Mutex<usize>>,
}

impl MockBroker {
    pub fn new(initial_buying_power: Decimal) -> Self {
        Self {
            buying_power: Arc::new(Mutex::new(initial_buying_power)),
            fail_symbols: Arc::new(HashSet::new()),
            submitted: Arc::new(Mutex::new(Vec::new())),
            account_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_failures(initial_buying_power: Decimal, fail_symbols: &[&str]) -> Self {
        Self {
            fail_symbols: Arc::new(fail_symbols.iter().map(|s| s.to_string()).collect()),
            ..Self::new(initial_buying_power)
        }
    }

    /// Orders accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn account_calls(&self) -> usize {
        *self.account_calls.lock().unwrap()
    }

    pub fn buying_power(&self) -> Decimal {
        *self.buying_power.lock().unwrap()
    }
}

#[async_trait]
impl Brokerage for MockBroker {
    async fn fetch_account(&self) -> Result<AccountSnapshot> {
        *self.account_calls.lock().unwrap() += 1;
        let bp = *self.buying_power.lock().unwrap();
        Ok(AccountSnapshot {
            buying_power: Some(bp),
            cash: Some(bp),
        })
    }

    async fn submit_market_buy(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        if self.fail_symbols.contains(&order.symbol) {
            anyhow::bail!("simulated rejection for {}", order.symbol);
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(order.clone());
        *self.buying_power.lock().unwrap() -= order.notional;

        Ok(OrderReceipt {
            order_id: format!("mock-{}", submitted.len()),
            status: "accepted".to_string(),
            qty: String::new(), // notional orders fill later
        })
    }

    fn name(&self) -> &str {
        "mock-broker"
    }
}
