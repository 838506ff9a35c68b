//! Trade monitor: records new Polymarket trades for a tracked account.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feed;
pub mod storage;
pub mod engine;
pub mod dashboard;
