//! Shared types for the trade monitor.
//!
//! The feed wire type (`ActivityRecord`), the stored unit (`TradeRecord`),
//! its identity (`TradeKey`), per-cycle reports and the error enums all live
//! here so the feed, storage and engine modules can depend on them without
//! depending on each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// Trade side
// ---------------------------------------------------------------------------

/// Direction of a trade as reported by the Data API.
///
/// Anything other than `BUY`/`SELL` (including an empty string or `null`)
/// becomes `Unknown` so one odd record cannot fail a whole response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
            TradeSide::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            "UNKNOWN" | "" => Ok(TradeSide::Unknown),
            other => anyhow::bail!("Unknown trade side: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade identity
// ---------------------------------------------------------------------------

/// The identity triple of a trade. Two records with the same key are the
/// same trade.
///
/// Field order matters: keys sort by timestamp first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TradeKey {
    pub timestamp: i64,
    pub transaction_hash: String,
    pub condition_id: String,
}

impl TradeKey {
    pub fn new(transaction_hash: impl Into<String>, timestamp: i64, condition_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            transaction_hash: transaction_hash.into(),
            condition_id: condition_id.into(),
        }
    }
}

impl fmt::Display for TradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.transaction_hash, self.timestamp, self.condition_id)
    }
}

// ---------------------------------------------------------------------------
// Feed record
// ---------------------------------------------------------------------------

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One element of the Data API `/activity` response.
///
/// Only the identity fields are required; an element missing one of them is
/// skipped by the feed. Everything else tolerates absence and `null`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityRecord {
    #[serde(default, rename = "proxyWallet", deserialize_with = "null_as_default")]
    pub proxy_wallet: String,
    pub timestamp: i64,
    #[serde(rename = "conditionId")]
    pub condition_id: String,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub activity_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: Decimal,
    #[serde(default, rename = "usdcSize", deserialize_with = "null_as_default")]
    pub usdc_size: Decimal,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub asset: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub side: TradeSide,
    #[serde(default, rename = "outcomeIndex", deserialize_with = "null_as_default")]
    pub outcome_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, rename = "eventSlug")]
    pub event_slug: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outcome: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pseudonym: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, rename = "profileImage")]
    pub profile_image: Option<String>,
    #[serde(default, rename = "profileImageOptimized")]
    pub profile_image_optimized: Option<String>,
}

impl ActivityRecord {
    pub fn key(&self) -> TradeKey {
        TradeKey::new(&self.transaction_hash, self.timestamp, &self.condition_id)
    }
}

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

/// A trade as recorded for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub proxy_wallet: String,
    pub timestamp: i64,
    pub condition_id: String,
    pub activity_type: String,
    pub size: Decimal,
    pub usdc_size: Decimal,
    pub transaction_hash: String,
    pub price: Decimal,
    pub asset: String,
    pub side: TradeSide,
    pub outcome_index: i64,
    pub title: String,
    pub slug: String,
    pub event_slug: String,
    pub outcome: String,
    pub name: String,
    pub pseudonym: String,
    pub bio: String,
    pub profile_image: String,
    /// Set by the downstream consumer once it has acted on the trade.
    pub actioned: bool,
    /// How many times the downstream consumer has acted on the trade.
    pub action_count: i64,
}

/// Empty strings count as absent, matching how the feed omits profile data.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TradeRecord {
    /// Enrich a feed record into a storable trade with ingestion defaults.
    pub fn from_activity(activity: ActivityRecord) -> Self {
        let profile_image = non_empty(activity.profile_image_optimized)
            .or_else(|| non_empty(activity.profile_image))
            .unwrap_or_default();

        TradeRecord {
            proxy_wallet: activity.proxy_wallet,
            timestamp: activity.timestamp,
            condition_id: activity.condition_id,
            activity_type: activity.activity_type,
            size: activity.size,
            usdc_size: activity.usdc_size,
            transaction_hash: activity.transaction_hash,
            price: activity.price,
            asset: activity.asset,
            side: activity.side,
            outcome_index: activity.outcome_index,
            title: activity.title,
            slug: activity.slug,
            event_slug: activity.event_slug.unwrap_or_default(),
            outcome: activity.outcome,
            name: activity.name,
            pseudonym: activity.pseudonym,
            bio: activity.bio.unwrap_or_default(),
            profile_image,
            actioned: false,
            action_count: 0,
        }
    }

    pub fn key(&self) -> TradeKey {
        TradeKey::new(&self.transaction_hash, self.timestamp, &self.condition_id)
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {} | {} | {}",
            self.activity_type,
            self.side,
            self.size,
            self.price,
            self.title,
            self.transaction_hash,
        )
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// A trade that was eligible but could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct FailedInsert {
    pub key: TradeKey,
    pub reason: String,
}

/// Summary of a single fetch-filter-persist cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub timestamp: DateTime<Utc>,
    pub fetched: usize,
    pub duplicates: usize,
    pub too_old: usize,
    pub persisted: Vec<TradeKey>,
    pub failed: Vec<FailedInsert>,
}

impl CycleReport {
    pub fn empty(cycle_number: u64) -> Self {
        Self {
            cycle_number,
            timestamp: Utc::now(),
            fetched: 0,
            duplicates: 0,
            too_old: 0,
            persisted: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Trades that passed both the duplicate and the staleness checks.
    pub fn new_trades(&self) -> usize {
        self.persisted.len() + self.failed.len()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle #{}: fetched={} new={} persisted={} failed={} duplicates={} too_old={}",
            self.cycle_number,
            self.fetched,
            self.new_trades(),
            self.persisted.len(),
            self.failed.len(),
            self.duplicates,
            self.too_old,
        )
    }
}

// ---------------------------------------------------------------------------
// Monitor status
// ---------------------------------------------------------------------------

/// Scheduler state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorPhase {
    Seeding,
    Polling,
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorPhase::Seeding => write!(f, "SEEDING"),
            MonitorPhase::Polling => write!(f, "POLLING"),
        }
    }
}

/// Number of cycle reports kept for the dashboard.
pub const CYCLE_LOG_CAPACITY: usize = 100;

/// Snapshot of the ingestion loop, published by the scheduler after every
/// phase change and cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub account: String,
    pub phase: MonitorPhase,
    pub started_at: DateTime<Utc>,
    pub cycles_run: u64,
    pub trades_recorded: u64,
    pub recent_keys: usize,
    pub recent_cycles: VecDeque<CycleReport>,
    pub last_error: Option<String>,
}

impl MonitorStatus {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            phase: MonitorPhase::Seeding,
            started_at: Utc::now(),
            cycles_run: 0,
            trades_recorded: 0,
            recent_keys: 0,
            recent_cycles: VecDeque::new(),
            last_error: None,
        }
    }

    /// Append a cycle report, dropping the oldest beyond capacity.
    pub fn record_cycle(&mut self, report: CycleReport) {
        if self.recent_cycles.len() == CYCLE_LOG_CAPACITY {
            self.recent_cycles.pop_front();
        }
        self.recent_cycles.push_back(report);
    }

    pub fn last_cycle(&self) -> Option<&CycleReport> {
        self.recent_cycles.back()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal errors: the process must not enter (or stay in) the polling phase.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Tracked account address is not set (checked {source_hint})")]
    MissingAccount { source_hint: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to seed recent trades for {account}: {source}")]
    Seed {
        account: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Recoverable errors: logged at the cycle boundary and discarded.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Activity feed request failed: {0}")]
    Feed(#[source] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
