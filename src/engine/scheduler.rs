//! Scheduler: seed once, then poll forever.
//!
//! `run` only returns when seeding fails. Cycle errors are logged and
//! discarded at `tick`, and the loop carries on after the usual sleep.

use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::engine::monitor::TradeMonitor;
use crate::types::{CycleReport, MonitorError, MonitorPhase, MonitorStatus};

/// Status shared with the dashboard.
pub type StatusHandle = Arc<RwLock<MonitorStatus>>;

pub fn status_handle(account: &str) -> StatusHandle {
    Arc::new(RwLock::new(MonitorStatus::new(account)))
}

/// Seed the monitor, then run cycles every `fetch_interval` for the life of
/// the process.
pub async fn run(mut monitor: TradeMonitor, status: StatusHandle) -> Result<Infallible, MonitorError> {
    let interval = monitor.settings().fetch_interval;
    info!(
        account = %monitor.account(),
        interval_secs = interval.as_secs_f64(),
        too_old_hours = monitor.settings().too_old_hours,
        "Trade Monitor is running every {} seconds",
        interval.as_secs_f64()
    );

    status.write().await.phase = MonitorPhase::Seeding;
    if let Err(e) = monitor.seed().await {
        error!(error = %e, "Seeding failed; not starting to poll");
        status.write().await.last_error = Some(e.to_string());
        return Err(e);
    }

    {
        let mut s = status.write().await;
        s.phase = MonitorPhase::Polling;
        s.trades_recorded = monitor.trades_recorded();
        s.recent_keys = monitor.recent().len();
    }

    loop {
        tick(&mut monitor, &status).await;
        tokio::time::sleep(interval).await;
    }
}

/// Run one cycle and publish its outcome. Errors stop here.
pub async fn tick(monitor: &mut TradeMonitor, status: &StatusHandle) -> Option<CycleReport> {
    let outcome = monitor.run_cycle().await;

    let mut s = status.write().await;
    s.cycles_run = monitor.cycles_run();
    s.trades_recorded = monitor.trades_recorded();
    s.recent_keys = monitor.recent().len();

    match outcome {
        Ok(report) => {
            if report.fetched > 0 {
                info!(
                    cycle = report.cycle_number,
                    fetched = report.fetched,
                    new = report.new_trades(),
                    persisted = report.persisted.len(),
                    failed = report.failed.len(),
                    "Cycle complete"
                );
            }
            s.record_cycle(report.clone());
            Some(report)
        }
        Err(e) => {
            error!(account = %monitor.account(), error = %e, "Error fetching trade data");
            s.last_error = Some(e.to_string());
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
