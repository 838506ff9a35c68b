//! Integration tests for the ingestion loop, wired through the public API
//! with in-memory feed and store doubles.

mod ingestion;
mod mock_store;
