//! End-to-end ingestion scenarios: seeding, dedup across cycles, staleness,
//! per-record failure isolation and the polling loop.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use trade_monitor::config::{AppConfig, MonitorSettings};
use trade_monitor::engine::monitor::TradeMonitor;
use trade_monitor::engine::scheduler;
use trade_monitor::storage::{SqliteTradeStore, TradeStore};
use trade_monitor::types::{MonitorError, MonitorPhase, TradeKey, TradeRecord};

use crate::mock_feed::{trade, Response, ScriptedFeed};
use crate::mock_store::MemoryStore;

const ACCOUNT: &str = "0xtracked";

fn settings(too_old_hours: f64) -> MonitorSettings {
    MonitorSettings {
        account: ACCOUNT.to_string(),
        too_old_hours,
        fetch_interval: Duration::from_millis(10),
    }
}

fn monitor(feed: &ScriptedFeed, store: Arc<dyn TradeStore>, too_old_hours: f64) -> TradeMonitor {
    TradeMonitor::new(settings(too_old_hours), Box::new(feed.clone()), store).unwrap()
}

#[tokio::test]
async fn test_trade_recorded_once_across_cycles() {
    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1")]));
    let store = MemoryStore::new();
    let mut m = monitor(&feed, Arc::new(store.clone()), 1.0);

    m.seed_at(1000 + 3599).await.unwrap();
    let first = m.run_cycle_at(1000 + 3599).await.unwrap();
    assert_eq!(first.persisted, vec![TradeKey::new("0xA", 1000, "c1")]);

    // The feed keeps returning the same trade.
    let second = m.run_cycle_at(1000 + 3599).await.unwrap();
    assert!(second.persisted.is_empty());
    assert_eq!(second.duplicates, 1);

    assert_eq!(store.records(ACCOUNT).len(), 1);
    assert_eq!(store.insert_attempts(), vec!["0xA".to_string()]);
    assert_eq!(feed.requests(), vec![ACCOUNT.to_string(), ACCOUNT.to_string()]);
}

#[tokio::test]
async fn test_seeded_trade_not_rewritten_after_restart() {
    let store = MemoryStore::new();
    store.preload(ACCOUNT, TradeRecord::from_activity(trade("0xA", 1000, "c1")));

    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1"), trade("0xB", 1500, "c1")]));
    let mut m = monitor(&feed, Arc::new(store.clone()), 1.0);

    assert_eq!(m.seed_at(2000).await.unwrap(), 1);
    let report = m.run_cycle_at(2000).await.unwrap();

    assert_eq!(report.duplicates, 1);
    assert_eq!(report.persisted, vec![TradeKey::new("0xB", 1500, "c1")]);
    assert_eq!(store.insert_attempts(), vec!["0xB".to_string()]);
}

#[tokio::test]
async fn test_staleness_boundary() {
    let now = 100_000;
    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![
        trade("0xexact", now - 3600, "c1"),
        trade("0xstale", now - 3601, "c1"),
        trade("0xfresh", now - 10, "c1"),
    ]));
    let store = MemoryStore::new();
    let mut m = monitor(&feed, Arc::new(store.clone()), 1.0);

    m.seed_at(now).await.unwrap();
    let report = m.run_cycle_at(now).await.unwrap();

    assert_eq!(report.too_old, 1);
    assert_eq!(store.insert_attempts(), vec!["0xexact".to_string(), "0xfresh".to_string()]);
}

#[tokio::test]
async fn test_same_hash_different_market_is_distinct() {
    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1"), trade("0xA", 1000, "c2")]));
    let store = MemoryStore::new();
    let mut m = monitor(&feed, Arc::new(store.clone()), 24.0);

    m.seed_at(1000).await.unwrap();
    let report = m.run_cycle_at(1000).await.unwrap();

    assert_eq!(report.persisted.len(), 2);
    assert_eq!(store.records(ACCOUNT).len(), 2);
}

#[tokio::test]
async fn test_failed_insert_does_not_block_the_rest() {
    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![
        trade("0x1", 1000, "c1"),
        trade("0x2", 1001, "c1"),
        trade("0x3", 1002, "c1"),
    ]));
    let store = MemoryStore::new();
    store.fail_inserts_of("0x2");
    let mut m = monitor(&feed, Arc::new(store.clone()), 24.0);

    m.seed_at(1100).await.unwrap();
    let report = m.run_cycle_at(1100).await.unwrap();

    assert_eq!(
        report.persisted,
        vec![TradeKey::new("0x1", 1000, "c1"), TradeKey::new("0x3", 1002, "c1")]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, TradeKey::new("0x2", 1001, "c1"));
    assert!(report.failed[0].reason.contains("simulated write failure"));

    // Not marked as seen, so the next cycle retries it.
    store.clear_insert_failures();
    let retry = m.run_cycle_at(1100).await.unwrap();
    assert_eq!(retry.persisted, vec![TradeKey::new("0x2", 1001, "c1")]);
    assert_eq!(retry.duplicates, 2);
    assert_eq!(store.records(ACCOUNT).len(), 3);
}

#[tokio::test]
async fn test_feed_error_leaves_state_untouched() {
    let feed = ScriptedFeed::new();
    feed.push(Response::Error("connection reset by peer".into()));
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1")]));
    let store = MemoryStore::new();
    let mut m = monitor(&feed, Arc::new(store.clone()), 24.0);

    m.seed_at(1000).await.unwrap();
    let err = m.run_cycle_at(1000).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
    assert!(m.recent().is_empty());

    let report = m.run_cycle_at(1000).await.unwrap();
    assert_eq!(report.persisted.len(), 1);
    assert_eq!(m.cycles_run(), 2);
}

#[tokio::test]
async fn test_persisted_record_is_enriched() {
    let mut activity = trade("0xA", 1000, "c1");
    activity.profile_image = Some("https://img/plain.png".into());
    activity.profile_image_optimized = Some(String::new());
    activity.size = dec!(42.5);

    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![activity]));
    let store = MemoryStore::new();
    let mut m = monitor(&feed, Arc::new(store.clone()), 24.0);

    m.seed_at(1000).await.unwrap();
    m.run_cycle_at(1000).await.unwrap();

    let stored = store.records(ACCOUNT);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].profile_image, "https://img/plain.png");
    assert_eq!(stored[0].event_slug, "");
    assert_eq!(stored[0].bio, "");
    assert!(!stored[0].actioned);
    assert_eq!(stored[0].action_count, 0);
    assert_eq!(stored[0].size, dec!(42.5));
}

#[tokio::test]
async fn test_restart_reseeds_from_sqlite() {
    let store = Arc::new(SqliteTradeStore::in_memory().await.unwrap());

    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1")]));
    let mut first = monitor(&feed, store.clone(), 24.0);
    first.seed_at(1000).await.unwrap();
    assert_eq!(first.run_cycle_at(1000).await.unwrap().persisted.len(), 1);
    drop(first);

    // A fresh monitor over the same store knows the trade already.
    let feed = ScriptedFeed::new();
    feed.push(Response::Records(vec![trade("0xA", 1000, "c1")]));
    let mut second = monitor(&feed, store.clone(), 24.0);
    assert_eq!(second.seed_at(1000).await.unwrap(), 1);
    let report = second.run_cycle_at(1000).await.unwrap();

    assert!(report.persisted.is_empty());
    assert_eq!(report.duplicates, 1);
    assert_eq!(store.find_all(ACCOUNT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_account_is_fatal_at_startup() {
    let cfg = AppConfig::parse("[monitor]\ntoo_old_hours = 2.0\n").unwrap();
    let err = cfg.monitor_settings(|_| None).unwrap_err();
    assert!(matches!(err, MonitorError::MissingAccount { .. }));

    let err = cfg.monitor_settings(|_| Some("   ".into())).unwrap_err();
    assert!(matches!(err, MonitorError::MissingAccount { .. }));
}

#[tokio::test]
async fn test_seed_failure_stops_the_loop() {
    let feed = ScriptedFeed::new();
    let store = MemoryStore::new();
    store.fail_reads("database disk image is malformed");
    let m = monitor(&feed, Arc::new(store), 24.0);
    let status = scheduler::status_handle(ACCOUNT);

    let result = scheduler::run(m, status.clone()).await;
    assert!(matches!(result, Err(MonitorError::Seed { .. })));
    assert!(feed.requests().is_empty());
    assert_eq!(status.read().await.phase, MonitorPhase::Seeding);
}

#[tokio::test]
async fn test_loop_keeps_polling_through_errors() {
    let now = Utc::now().timestamp();
    let feed = ScriptedFeed::new();
    feed.push(Response::Error("503 Service Unavailable".into()));
    feed.push(Response::Records(vec![trade("0xlive", now, "c1")]));
    let store = MemoryStore::new();
    let m = monitor(&feed, Arc::new(store.clone()), 24.0);
    let status = scheduler::status_handle(ACCOUNT);

    let outcome = tokio::time::timeout(
        Duration::from_millis(300),
        scheduler::run(m, status.clone()),
    )
    .await;
    assert!(outcome.is_err(), "run only returns on a fatal error");

    assert!(feed.requests().len() >= 3);
    assert_eq!(store.records(ACCOUNT).len(), 1);

    let s = status.read().await;
    assert_eq!(s.phase, MonitorPhase::Polling);
    assert_eq!(s.trades_recorded, 1);
    assert!(s.last_error.as_deref().unwrap_or("").contains("503"));
}
