//! Crawl frontier coordination
//!
//! This module turns the storage primitives into the operations workers use:
//! - `OwnerToken`: a per-attempt identity stamped onto every lock
//! - `claim_batch`: reserve up to N eligible records for one owner
//! - `store_discovered_links`: insert-if-absent ingestion of extracted links

mod claim;
mod links;
mod owner;

pub use claim::{claim_batch, ClaimPolicy};
pub use links::{store_discovered_links, LinkIngestReport};
pub use owner::OwnerToken;

pub use crate::storage::ClaimedUrl;
