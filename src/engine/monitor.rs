//! Trade monitor: seeds the recency set, then runs fetch → filter → persist
//! cycles for the tracked account.
//!
//! Writes happen one at a time in feed order. A failed insert is logged and
//! recorded in the cycle report; the remaining trades are still attempted.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::MonitorSettings;
use crate::engine::filter::select_new;
use crate::engine::recency::RecencySet;
use crate::feed::ActivityFeed;
use crate::storage::TradeStore;
use crate::types::{CycleError, CycleReport, FailedInsert, MonitorError, TradeRecord};

pub struct TradeMonitor {
    settings: MonitorSettings,
    feed: Box<dyn ActivityFeed>,
    store: Arc<dyn TradeStore>,
    recent: RecencySet,
    cycles_run: u64,
    trades_recorded: u64,
    // Latest clock reading seen; pruning is only safe if time never runs back.
    latest_now: i64,
}

impl TradeMonitor {
    pub fn new(
        settings: MonitorSettings,
        feed: Box<dyn ActivityFeed>,
        store: Arc<dyn TradeStore>,
    ) -> Result<Self, MonitorError> {
        if settings.account.trim().is_empty() {
            return Err(MonitorError::MissingAccount {
                source_hint: "monitor settings".to_string(),
            });
        }

        Ok(Self {
            settings,
            feed,
            store,
            recent: RecencySet::new(),
            cycles_run: 0,
            trades_recorded: 0,
            latest_now: i64::MIN,
        })
    }

    pub fn account(&self) -> &str {
        &self.settings.account
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn recent(&self) -> &RecencySet {
        &self.recent
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Trades known to be stored for the account: seeded plus persisted.
    pub fn trades_recorded(&self) -> u64 {
        self.trades_recorded
    }

    /// Clamp `now` so a clock stepping backwards can't revive pruned keys.
    fn observe_clock(&mut self, now: i64) -> i64 {
        if now < self.latest_now {
            debug!(now, latest = self.latest_now, "Clock went backwards; holding at latest reading");
        }
        self.latest_now = self.latest_now.max(now);
        self.latest_now
    }

    /// Load previously recorded trades into the recency set.
    pub async fn seed(&mut self) -> Result<usize, MonitorError> {
        self.seed_at(Utc::now().timestamp()).await
    }

    pub async fn seed_at(&mut self, now: i64) -> Result<usize, MonitorError> {
        let now = self.observe_clock(now);
        let stored = self
            .store
            .find_all(&self.settings.account)
            .await
            .map_err(|source| MonitorError::Seed {
                account: self.settings.account.clone(),
                source,
            })?;

        let count = stored.len();
        self.recent.extend(stored.iter().map(TradeRecord::key));
        let pruned = self.recent.prune(now, self.settings.too_old_hours);
        self.trades_recorded = count as u64;

        info!(
            account = %self.settings.account,
            stored = count,
            tracked = self.recent.len(),
            pruned,
            "Seeded recent trades from store"
        );
        Ok(count)
    }

    /// Run one fetch → filter → persist cycle at the current time.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(Utc::now().timestamp()).await
    }

    /// Run one cycle as if the clock read `now` (unix seconds).
    pub async fn run_cycle_at(&mut self, now: i64) -> Result<CycleReport, CycleError> {
        let now = self.observe_clock(now);
        self.cycles_run += 1;
        let mut report = CycleReport::empty(self.cycles_run);
        let too_old_hours = self.settings.too_old_hours;

        let activities = self
            .feed
            .fetch_trades(&self.settings.account)
            .await
            .map_err(CycleError::Feed)?;

        if activities.is_empty() {
            debug!(account = %self.settings.account, "No activity returned");
            return Ok(report);
        }
        report.fetched = activities.len();

        self.recent.prune(now, too_old_hours);
        let selection = select_new(activities, &self.recent, now, too_old_hours);
        report.duplicates = selection.duplicates;
        report.too_old = selection.too_old;

        if selection.new.is_empty() {
            debug!(
                account = %self.settings.account,
                fetched = report.fetched,
                duplicates = report.duplicates,
                too_old = report.too_old,
                "No new trades"
            );
            return Ok(report);
        }

        info!(
            account = %self.settings.account,
            count = selection.new.len(),
            "Found {} new trade(s) from user {}",
            selection.new.len(),
            self.settings.account
        );

        for activity in selection.new {
            let record = TradeRecord::from_activity(activity);
            let key = record.key();

            match self.store.insert(&self.settings.account, &record).await {
                Ok(()) => {
                    self.recent.insert(key.clone());
                    self.trades_recorded += 1;
                    info!(
                        activity_type = %record.activity_type,
                        side = %record.side,
                        size = %record.size,
                        price = %record.price,
                        market = %record.title,
                        hash = %record.transaction_hash,
                        "New trade saved"
                    );
                    report.persisted.push(key);
                }
                Err(e) => {
                    error!(
                        error = %e,
                        trade = ?record,
                        "Error saving trade to database"
                    );
                    report.failed.push(FailedInsert {
                        key,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
