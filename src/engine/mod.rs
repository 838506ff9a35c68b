//! Core engine: the seed → fetch → filter → persist loop.

pub mod filter;
pub mod monitor;
pub mod recency;
pub mod scheduler;
