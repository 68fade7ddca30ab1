//! Alpaca Trading API integration.
//!
//! Market buy orders are notional-denominated (dollar amount, not share
//! count), so fills resolve asynchronously and the submission response
//! often has no quantity yet.
//!
//! API docs: https://docs.alpaca.markets/reference
//! Base URL: https://api.alpaca.markets (live) or
//!           https://paper-api.alpaca.markets (paper)
//! Auth: `APCA-API-KEY-ID` / `APCA-API-SECRET-KEY` headers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, info};

use super::Brokerage;
use crate::types::{AccountSnapshot, OrderReceipt, OrderRequest};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BROKER_NAME: &str = "alpaca";

// ---------------------------------------------------------------------------
// API response types (Alpaca JSON → Rust)
// ---------------------------------------------------------------------------

/// `GET /v2/account`, reduced to the capacity fields. Alpaca reports
/// monetary amounts as decimal strings; margin accounts carry both
/// fields, cash accounts may omit or zero `buying_power`.
#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    #[serde(default)]
    buying_power: Option<String>,
    #[serde(default)]
    cash: Option<String>,
}

impl AlpacaAccount {
    /// An unparsable capacity string is treated as absent, so the
    /// buying-power→cash fallback still applies.
    fn to_snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            buying_power: self
                .buying_power
                .as_deref()
                .and_then(|s| s.parse::<Decimal>().ok()),
            cash: self.cash.as_deref().and_then(|s| s.parse::<Decimal>().ok()),
        }
    }
}

/// `POST /v2/orders`, read permissively. A partially-populated response
/// must never fail logging: missing `qty` is normal pre-fill, missing
/// `status` defaults to a submitted placeholder.
#[derive(Debug, Deserialize)]
struct AlpacaOrder {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    qty: Option<String>,
}

impl AlpacaOrder {
    fn to_receipt(self) -> OrderReceipt {
        OrderReceipt {
            order_id: self.id.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| "submitted".to_string()),
            qty: self.qty.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Alpaca trading client.
pub struct AlpacaClient {
    http: Client,
    base_url: String,
    key_id: String,
    secret_key: Secret<String>,
}

impl AlpacaClient {
    pub fn new(base_url: String, key_id: String, secret_key: Secret<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("sweep/0.1.0 (buy-cycle-agent)")
            .build()
            .context("Failed to build HTTP client for Alpaca")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            secret_key,
        })
    }

    fn authed(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        rb.header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", self.secret_key.expose_secret())
    }

    /// Request body for a notional market buy. The order shape is fixed:
    /// market type, day time-in-force, buy side.
    fn order_body(order: &OrderRequest) -> serde_json::Value {
        serde_json::json!({
            "symbol": order.symbol,
            "side": "buy",
            "type": "market",
            "time_in_force": "day",
            "notional": format!("{:.2}", order.notional),
            "extended_hours": order.extended_hours,
            "client_order_id": order.client_order_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Brokerage trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Brokerage for AlpacaClient {
    async fn fetch_account(&self) -> Result<AccountSnapshot> {
        let url = format!("{}/v2/account", self.base_url);
        debug!(url = %url, "Fetching account snapshot");

        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .context("Alpaca account request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Alpaca account error {status}: {body}");
        }

        let account: AlpacaAccount = resp
            .json()
            .await
            .context("Failed to parse Alpaca account response")?;

        let snapshot = account.to_snapshot();
        debug!(%snapshot, "Account snapshot fetched");
        Ok(snapshot)
    }

    async fn submit_market_buy(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        let url = format!("{}/v2/orders", self.base_url);
        let body = Self::order_body(order);

        let resp = self
            .authed(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .context("Alpaca order request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Alpaca order rejected {status}: {body}");
        }

        let placed: AlpacaOrder = resp
            .json()
            .await
            .context("Failed to parse Alpaca order response")?;

        let receipt = placed.to_receipt();

        info!(
            symbol = %order.symbol,
            notional = format!("${:.2}", order.notional),
            order_id = %receipt.order_id,
            status = %receipt.status,
            "Order submitted"
        );

        Ok(receipt)
    }

    fn name(&self) -> &str {
        BROKER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
