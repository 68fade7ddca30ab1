//! SWEEP — Screener-driven notional buy cycle.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves credentials, builds the sheet and brokerage clients, and
//! runs the buy cycle: once by default, or on an interval with
//! graceful shutdown when configured.

use anyhow::Result;
use secrecy::Secret;
use std::time::Duration;
use tracing::{error, info};

use sweep::broker::alpaca::AlpacaClient;
use sweep::config::AppConfig;
use sweep::engine::orchestrator::{CycleConfig, CycleOrchestrator};
use sweep::sheets::google::GoogleSheetsClient;
use sweep::types::CycleReport;

const BANNER: &str = r#"
  ______        _______ _____ ____
 / ___\ \      / / ____| ____|  _ \
 \___ \\ \ /\ / /|  _| |  _| | |_) |
  ___) |\ V  V / | |___| |___|  __/
 |____/  \_/\_/  |_____|_____|_|

  Screener-driven notional buy cycle
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        screener_tab = %cfg.sheets.screener_tab,
        log_tab = %cfg.sheets.log_tab,
        percent_per_trade = %cfg.trading.percent_per_trade,
        extended_hours = cfg.trading.extended_hours,
        "SWEEP starting up"
    );

    // -- Resolve credentials ----------------------------------------------
    // Missing credentials abort here, before any symbol is processed.

    let sheets_token = AppConfig::resolve_env_any(&[cfg.sheets.token_env.as_str()])?;
    let alpaca_key = AppConfig::resolve_env_any(&[cfg.broker.key_env.as_str(), "APCA_API_KEY_ID"])?;
    let alpaca_secret =
        AppConfig::resolve_env_any(&[cfg.broker.secret_env.as_str(), "APCA_API_SECRET_KEY"])?;

    // -- Build collaborators ----------------------------------------------

    let store = GoogleSheetsClient::new(
        cfg.sheets.spreadsheet_id.clone(),
        Secret::new(sheets_token),
    )?;

    let broker = AlpacaClient::new(
        cfg.broker.base_url.clone(),
        alpaca_key,
        Secret::new(alpaca_secret),
    )?;

    let orchestrator =
        CycleOrchestrator::new(Box::new(broker), Box::new(store), CycleConfig::from_app(&cfg));

    // -- Run ---------------------------------------------------------------

    match cfg.agent.run_interval_secs {
        // Single shot: cron (or the operator) is the scheduler. Any cycle
        // failure propagates for a non-zero exit.
        None => {
            let report = orchestrator.run_cycle().await?;
            log_cycle_report(&report);
        }
        // Interval mode: keep running until Ctrl+C; a failed cycle is
        // logged and the next one still runs.
        Some(secs) => {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            info!(interval_secs = secs, "Entering cycle loop. Press Ctrl+C to stop.");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match orchestrator.run_cycle().await {
                            Ok(report) => log_cycle_report(&report),
                            Err(e) => error!(error = format!("{e:#}"), "Cycle failed — continuing to next"),
                        }
                    }
                    _ = &mut shutdown => {
                        info!("Shutdown signal received.");
                        break;
                    }
                }
            }
        }
    }

    info!("SWEEP shut down cleanly.");
    Ok(())
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        symbols = report.symbols_seen,
        submitted = report.submitted,
        skipped = report.skipped,
        errored = report.errored,
        committed = format!("${:.2}", report.total_notional),
        "Cycle complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sweep=info"));

    let json_logging = std::env::var("SWEEP_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
