//! In-memory trade store for integration testing.
//!
//! Enforces the same identity uniqueness as the SQLite store and can be told
//! to fail specific inserts or every read.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use trade_monitor::storage::TradeStore;
use trade_monitor::types::TradeRecord;

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<String, Vec<TradeRecord>>>>,
    failing_hashes: Arc<Mutex<HashSet<String>>>,
    read_error: Arc<Mutex<Option<String>>>,
    insert_attempts: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a record as if written by an earlier run.
    pub fn preload(&self, account: &str, record: TradeRecord) {
        self.rows
            .lock()
            .unwrap()
            .entry(account.to_string())
            .or_default()
            .push(record);
    }

    /// Make inserts of this transaction hash fail.
    pub fn fail_inserts_of(&self, hash: &str) {
        self.failing_hashes.lock().unwrap().insert(hash.to_string());
    }

    pub fn clear_insert_failures(&self) {
        self.failing_hashes.lock().unwrap().clear();
    }

    /// Make every `find_all` fail.
    pub fn fail_reads(&self, msg: &str) {
        *self.read_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn records(&self, account: &str) -> Vec<TradeRecord> {
        self.rows
            .lock()
            .unwrap()
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Transaction hashes passed to `insert`, in call order.
    pub fn insert_attempts(&self) -> Vec<String> {
        self.insert_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn find_all(&self, account: &str) -> Result<Vec<TradeRecord>> {
        if let Some(err) = self.read_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(self.records(account))
    }

    async fn insert(&self, account: &str, record: &TradeRecord) -> Result<()> {
        self.insert_attempts
            .lock()
            .unwrap()
            .push(record.transaction_hash.clone());

        if self.failing_hashes.lock().unwrap().contains(&record.transaction_hash) {
            return Err(anyhow!("simulated write failure for {}", record.transaction_hash));
        }

        let mut rows = self.rows.lock().unwrap();
        let existing = rows.entry(account.to_string()).or_default();
        if existing.iter().any(|r| r.key() == record.key()) {
            return Err(anyhow!("UNIQUE constraint failed: {}", record.key()));
        }
        existing.push(record.clone());
        Ok(())
    }
}
