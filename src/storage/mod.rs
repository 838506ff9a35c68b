//! Persistence layer.
//!
//! Recorded trades live in SQLite, one row per trade, keyed by the tracked
//! account. The `TradeStore` trait is the seam the ingestion loop writes
//! through; `SqliteTradeStore` is the production implementation.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::TradeRecord;

pub use sqlite::SqliteTradeStore;

/// Durable store of recorded trades.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// All records stored for `account`, in no particular order.
    async fn find_all(&self, account: &str) -> Result<Vec<TradeRecord>>;

    /// Persist one record for `account`. Fails if the record's identity
    /// triple is already stored for that account.
    async fn insert(&self, account: &str, record: &TradeRecord) -> Result<()>;
}
