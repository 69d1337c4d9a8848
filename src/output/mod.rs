//! Output module for frontier reports
//!
//! This module handles:
//! - Aggregating frontier statistics from storage
//! - Printing them for operators

pub mod stats;

pub use stats::{load_statistics, print_statistics, FrontierStatistics};
