//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, sheet tokens) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::SweepError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    pub sheets: SheetsConfig,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// When set, keep the process alive and run a cycle on this interval.
    /// When absent, run one cycle and exit (cron is the scheduler).
    #[serde(default)]
    pub run_interval_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            run_interval_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_screener_tab")]
    pub screener_tab: String,
    #[serde(default = "default_log_tab")]
    pub log_tab: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    /// Live by default; point at the paper endpoint for dry runs.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradingConfig {
    /// Percentage of current buying power committed per symbol.
    #[serde(default = "default_percent_per_trade")]
    pub percent_per_trade: Decimal,
    /// Floor below which an order is skipped rather than submitted.
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    /// Throttle after each successful submission, for upstream rate limits.
    #[serde(default = "default_sleep_between_orders_ms")]
    pub sleep_between_orders_ms: u64,
    #[serde(default)]
    pub extended_hours: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            percent_per_trade: default_percent_per_trade(),
            min_order_notional: default_min_order_notional(),
            sleep_between_orders_ms: default_sleep_between_orders_ms(),
            extended_hours: false,
        }
    }
}

impl TradingConfig {
    pub fn sleep_between_orders(&self) -> Duration {
        Duration::from_millis(self.sleep_between_orders_ms)
    }
}

fn default_agent_name() -> String {
    "SWEEP-001".to_string()
}

fn default_screener_tab() -> String {
    "screener".to_string()
}

fn default_log_tab() -> String {
    "log".to_string()
}

fn default_token_env() -> String {
    "GOOGLE_SHEETS_TOKEN".to_string()
}

fn default_base_url() -> String {
    "https://api.alpaca.markets".to_string()
}

fn default_key_env() -> String {
    "ALPACA_API_KEY".to_string()
}

fn default_secret_env() -> String {
    "ALPACA_SECRET_KEY".to_string()
}

fn default_percent_per_trade() -> Decimal {
    dec!(5.0)
}

fn default_min_order_notional() -> Decimal {
    dec!(1.00)
}

fn default_sleep_between_orders_ms() -> u64 {
    500
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve the first set variable out of a fallback chain of names.
    ///
    /// The Alpaca credentials accept both the config-declared names and
    /// the standard `APCA_*` names the SDKs use.
    pub fn resolve_env_any(env_names: &[&str]) -> Result<String, SweepError> {
        for name in env_names {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    return Ok(value);
                }
            }
        }
        Err(SweepError::MissingCredential(env_names.join(", ")))
    }
}
