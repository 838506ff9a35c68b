//! Polymarket Data API integration.
//!
//! Reads a wallet's public activity from the Data API (no auth required):
//!
//! `GET https://data-api.polymarket.com/activity?user=<address>&type=TRADE`
//!
//! The response is a JSON array of activity records, newest first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DataApiConfig;
use crate::feed::ActivityFeed;
use crate::types::ActivityRecord;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Activity type filter sent with every request.
const TRADE_ACTIVITY: &str = "TRADE";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct DataApiClient {
    http: Client,
    base_url: String,
}

impl DataApiClient {
    pub fn new(cfg: &DataApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build Data API HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn activity_url(&self) -> String {
        format!("{}/activity", self.base_url)
    }

    /// Fetch trade activity for `account`.
    ///
    /// A JSON `null` body is treated as no activity. Elements that cannot be
    /// decoded (usually a missing identity field) are logged and skipped.
    pub async fn fetch_activity(&self, account: &str) -> Result<Vec<ActivityRecord>> {
        let url = self.activity_url();
        debug!(account, "Fetching activity from Data API");

        let resp = self
            .http
            .get(&url)
            .query(&[("user", account), ("type", TRADE_ACTIVITY)])
            .send()
            .await
            .context("Data API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Data API error {status}: {body}");
        }

        let elements: Option<Vec<serde_json::Value>> = resp
            .json()
            .await
            .context("Failed to parse Data API activity response")?;

        let records = decode_records(elements.unwrap_or_default());
        debug!(account, count = records.len(), "Fetched activity records");
        Ok(records)
    }
}

/// Decode each element on its own so one bad record doesn't cost the batch.
fn decode_records(elements: Vec<serde_json::Value>) -> Vec<ActivityRecord> {
    elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            match serde_json::from_value::<ActivityRecord>(element) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable activity record");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl ActivityFeed for DataApiClient {
    async fn fetch_trades(&self, account: &str) -> Result<Vec<ActivityRecord>> {
        self.fetch_activity(account).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
