//! Integration tests for the frontier
//!
//! Multi-connection tests share an on-disk database in a temp directory;
//! fetcher and worker tests run against wiremock servers.

mod claiming;
mod common;
mod fetcher;
mod pipeline;
mod recovery;
