//! Recency set: fast duplicate lookup for trades already recorded.
//!
//! Only keys still inside the staleness window are kept. Anything older can
//! never pass the staleness check again, so forgetting it cannot let a
//! duplicate through.

use std::collections::BTreeSet;

use crate::engine::filter::is_too_old;
use crate::types::TradeKey;

#[derive(Debug, Default)]
pub struct RecencySet {
    // Ordered by timestamp (see `TradeKey`), so the oldest keys sit at the front.
    keys: BTreeSet<TradeKey>,
}

impl RecencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &TradeKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns false if the key was already present.
    pub fn insert(&mut self, key: TradeKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop every key that is too old to be eligible at `now`.
    /// Returns the number of keys removed.
    ///
    /// Callers must not pass a `now` earlier than a previous call;
    /// `TradeMonitor` clamps its clock for this.
    pub fn prune(&mut self, now: i64, too_old_hours: f64) -> usize {
        let mut removed = 0;
        while self
            .keys
            .first()
            .is_some_and(|oldest| is_too_old(now, oldest.timestamp, too_old_hours))
        {
            self.keys.pop_first();
            removed += 1;
        }
        removed
    }
}

impl Extend<TradeKey> for RecencySet {
    fn extend<I: IntoIterator<Item = TradeKey>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}
