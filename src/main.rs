//! Trade monitor entry point.
//!
//! Loads configuration, initialises structured logging, opens the trade
//! store, seeds the recency set and then polls the tracked account's
//! activity until the process is stopped.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use trade_monitor::config::{self, AppConfig};
use trade_monitor::dashboard::{self, routes::DashboardState};
use trade_monitor::engine::monitor::TradeMonitor;
use trade_monitor::engine::scheduler;
use trade_monitor::feed::polymarket::DataApiClient;
use trade_monitor::storage::{SqliteTradeStore, TradeStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var(config::CONFIG_PATH_ENV)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_FILE.to_string());
    let mut cfg = AppConfig::load_or_default(&config_path)?;
    cfg.apply_env_overrides(|k| std::env::var(k).ok())?;

    // Missing account is fatal: nothing below runs without one.
    let settings = cfg.monitor_settings(|k| std::env::var(k).ok())?;

    info!(
        account = %settings.account,
        too_old_hours = settings.too_old_hours,
        fetch_interval_secs = cfg.monitor.fetch_interval_secs,
        database_url = %cfg.storage.database_url,
        "Trade monitor starting up"
    );

    let store: Arc<dyn TradeStore> = Arc::new(SqliteTradeStore::open(&cfg.storage).await?);
    let feed = DataApiClient::new(&cfg.data_api)?;
    let status = scheduler::status_handle(&settings.account);

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(
            Arc::new(DashboardState::new(status.clone(), store.clone())),
            cfg.dashboard.port,
        );
    }

    let monitor = TradeMonitor::new(settings, Box::new(feed), store)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        result = scheduler::run(monitor, status) => {
            match result? {}
        }
        _ = &mut shutdown => {
            info!("Shutdown signal received.");
        }
    }

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trade_monitor=info"));

    let json_logging = std::env::var("TRADE_MONITOR_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
