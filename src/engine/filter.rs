//! Eligibility filter: which fetched records are new, actionable trades.
//!
//! A record is new when its identity is not in the recency set and it is no
//! older than the staleness threshold. Age is measured in fractional hours
//! and a trade exactly at the threshold is still eligible.

use std::collections::HashSet;

use crate::engine::recency::RecencySet;
use crate::types::{ActivityRecord, TradeKey};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Hours elapsed between `timestamp` and `now` (negative for future trades).
pub fn age_hours(now: i64, timestamp: i64) -> f64 {
    now.saturating_sub(timestamp) as f64 / SECONDS_PER_HOUR
}

pub fn is_too_old(now: i64, timestamp: i64, too_old_hours: f64) -> bool {
    age_hours(now, timestamp) > too_old_hours
}

/// Why a record was (or wasn't) selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    Duplicate,
    TooOld,
}

pub fn classify(key: &TradeKey, recent: &RecencySet, now: i64, too_old_hours: f64) -> Verdict {
    if recent.contains(key) {
        Verdict::Duplicate
    } else if is_too_old(now, key.timestamp, too_old_hours) {
        Verdict::TooOld
    } else {
        Verdict::New
    }
}

/// Outcome of filtering one feed response.
#[derive(Debug, Default)]
pub struct Selection {
    /// Eligible records, in feed order.
    pub new: Vec<ActivityRecord>,
    pub duplicates: usize,
    pub too_old: usize,
}

/// Split a feed response into new trades and skipped noise.
///
/// A triple repeated within the same response is only selected once.
pub fn select_new(
    records: Vec<ActivityRecord>,
    recent: &RecencySet,
    now: i64,
    too_old_hours: f64,
) -> Selection {
    let mut selection = Selection::default();
    let mut in_batch: HashSet<TradeKey> = HashSet::new();

    for record in records {
        let key = record.key();
        match classify(&key, recent, now, too_old_hours) {
            Verdict::Duplicate => selection.duplicates += 1,
            Verdict::TooOld => selection.too_old += 1,
            Verdict::New => {
                if in_batch.insert(key) {
                    selection.new.push(record);
                } else {
                    selection.duplicates += 1;
                }
            }
        }
    }

    selection
}
