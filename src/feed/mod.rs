//! Trade-activity feeds.
//!
//! Defines the `ActivityFeed` trait and the Polymarket Data API
//! implementation used in production.

pub mod polymarket;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::ActivityRecord;

/// Source of trade-activity records for an account.
///
/// Implementors return the records in feed order, or an error when the
/// request or the response decoding fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Fetch current trade-type activity for `account`.
    async fn fetch_trades(&self, account: &str) -> Result<Vec<ActivityRecord>>;
}
