//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::engine::scheduler::StatusHandle;
use crate::storage::TradeStore;
use crate::types::{CycleReport, TradeRecord};

/// Maximum trades returned by `/api/trades`.
const TRADES_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub status: StatusHandle,
    pub store: Arc<dyn TradeStore>,
}

impl DashboardState {
    pub fn new(status: StatusHandle, store: Arc<dyn TradeStore>) -> Self {
        Self { status, store }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub account: String,
    pub phase: String,
    pub cycles_run: u64,
    pub trades_recorded: u64,
    pub recent_keys: usize,
    pub uptime_secs: i64,
    pub last_cycle: Option<CycleReport>,
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let s = state.status.read().await;
    Json(StatusResponse {
        account: s.account.clone(),
        phase: s.phase.to_string(),
        cycles_run: s.cycles_run,
        trades_recorded: s.trades_recorded,
        recent_keys: s.recent_keys,
        uptime_secs: (chrono::Utc::now() - s.started_at).num_seconds(),
        last_cycle: s.last_cycle().cloned(),
        last_error: s.last_error.clone(),
    })
}

/// GET /api/cycles
pub async fn get_cycles(State(state): State<AppState>) -> Json<Vec<CycleReport>> {
    let s = state.status.read().await;
    Json(s.recent_cycles.iter().cloned().collect())
}

/// GET /api/trades: newest recorded trades first.
pub async fn get_trades(
    State(state): State<AppState>,
) -> Result<Json<Vec<TradeRecord>>, StatusCode> {
    let account = state.status.read().await.account.clone();
    let mut trades = state.store.find_all(&account).await.map_err(|e| {
        warn!(error = %e, "Failed to load trades for dashboard");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    trades.truncate(TRADES_LIMIT);
    Ok(Json(trades))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
