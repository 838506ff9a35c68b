//! SQLite-backed trade store (sqlx).
//!
//! One `user_activities` table holds every tracked account's trades. The
//! unique index on `(account, transaction_hash, timestamp, condition_id)`
//! backs the identity invariant at the storage level, so a duplicate insert
//! fails instead of silently creating a second row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::storage::TradeStore;
use crate::types::{MonitorError, TradeRecord, TradeSide};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_activities (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    account          TEXT    NOT NULL,
    proxy_wallet     TEXT    NOT NULL,
    timestamp        INTEGER NOT NULL,
    condition_id     TEXT    NOT NULL,
    activity_type    TEXT    NOT NULL,
    size             TEXT    NOT NULL,
    usdc_size        TEXT    NOT NULL,
    transaction_hash TEXT    NOT NULL,
    price            TEXT    NOT NULL,
    asset            TEXT    NOT NULL,
    side             TEXT    NOT NULL,
    outcome_index    INTEGER NOT NULL,
    title            TEXT    NOT NULL,
    slug             TEXT    NOT NULL,
    event_slug       TEXT    NOT NULL,
    outcome          TEXT    NOT NULL,
    name             TEXT    NOT NULL,
    pseudonym        TEXT    NOT NULL,
    bio              TEXT    NOT NULL,
    profile_image    TEXT    NOT NULL,
    actioned         INTEGER NOT NULL DEFAULT 0,
    action_count     INTEGER NOT NULL DEFAULT 0
)
"#;

const CREATE_IDENTITY_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_user_activities_identity
    ON user_activities (account, transaction_hash, timestamp, condition_id)
"#;

const INSERT_TRADE: &str = r#"
INSERT INTO user_activities (
    account, proxy_wallet, timestamp, condition_id, activity_type, size,
    usdc_size, transaction_hash, price, asset, side, outcome_index, title,
    slug, event_slug, outcome, name, pseudonym, bio, profile_image,
    actioned, action_count
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_TRADES: &str = r#"
SELECT proxy_wallet, timestamp, condition_id, activity_type, size, usdc_size,
       transaction_hash, price, asset, side, outcome_index, title, slug,
       event_slug, outcome, name, pseudonym, bio, profile_image, actioned,
       action_count
FROM user_activities
WHERE account = ?
"#;

/// Row shape as stored; decimals and side are kept as text.
#[derive(Debug, sqlx::FromRow)]
struct TradeRow {
    proxy_wallet: String,
    timestamp: i64,
    condition_id: String,
    activity_type: String,
    size: String,
    usdc_size: String,
    transaction_hash: String,
    price: String,
    asset: String,
    side: String,
    outcome_index: i64,
    title: String,
    slug: String,
    event_slug: String,
    outcome: String,
    name: String,
    pseudonym: String,
    bio: String,
    profile_image: String,
    actioned: bool,
    action_count: i64,
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid decimal in column {column}: {value}"))
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = anyhow::Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        Ok(TradeRecord {
            size: parse_decimal("size", &row.size)?,
            usdc_size: parse_decimal("usdc_size", &row.usdc_size)?,
            price: parse_decimal("price", &row.price)?,
            side: row.side.parse::<TradeSide>()?,
            proxy_wallet: row.proxy_wallet,
            timestamp: row.timestamp,
            condition_id: row.condition_id,
            activity_type: row.activity_type,
            transaction_hash: row.transaction_hash,
            asset: row.asset,
            outcome_index: row.outcome_index,
            title: row.title,
            slug: row.slug,
            event_slug: row.event_slug,
            outcome: row.outcome,
            name: row.name,
            pseudonym: row.pseudonym,
            bio: row.bio,
            profile_image: row.profile_image,
            actioned: row.actioned,
            action_count: row.action_count,
        })
    }
}

pub struct SqliteTradeStore {
    pool: SqlitePool,
}

impl SqliteTradeStore {
    /// Open (creating if missing) the database and ensure the schema exists.
    pub async fn connect(cfg: &StorageConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&cfg.database_url)
            .with_context(|| format!("Invalid database URL: {}", cfg.database_url))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection.
        let in_memory = cfg.database_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(cfg.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", cfg.database_url))?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(database_url = %cfg.database_url, "Trade store ready");
        Ok(store)
    }

    /// `connect` for startup: any failure is fatal to the process.
    pub async fn open(cfg: &StorageConfig) -> Result<Self, MonitorError> {
        Self::connect(cfg)
            .await
            .map_err(|e| MonitorError::Storage(format!("{e:#}")))
    }

    /// A private in-memory store, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&StorageConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create user_activities table")?;
        sqlx::query(CREATE_IDENTITY_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create identity index")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TradeStore for SqliteTradeStore {
    async fn find_all(&self, account: &str) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(SELECT_TRADES)
            .bind(account)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load trades for {account}"))?;

        debug!(account, count = rows.len(), "Loaded stored trades");
        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    async fn insert(&self, account: &str, record: &TradeRecord) -> Result<()> {
        sqlx::query(INSERT_TRADE)
            .bind(account)
            .bind(&record.proxy_wallet)
            .bind(record.timestamp)
            .bind(&record.condition_id)
            .bind(&record.activity_type)
            .bind(record.size.to_string())
            .bind(record.usdc_size.to_string())
            .bind(&record.transaction_hash)
            .bind(record.price.to_string())
            .bind(&record.asset)
            .bind(record.side.to_string())
            .bind(record.outcome_index)
            .bind(&record.title)
            .bind(&record.slug)
            .bind(&record.event_slug)
            .bind(&record.outcome)
            .bind(&record.name)
            .bind(&record.pseudonym)
            .bind(&record.bio)
            .bind(&record.profile_image)
            .bind(record.actioned)
            .bind(record.action_count)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert trade {}", record.key()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
