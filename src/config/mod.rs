//! Configuration module for Tidewater
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file section falls back to the defaults.
//!
//! # Example
//!
//! ```no_run
//! use tidewater::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidewater.toml")).unwrap();
//! println!("Recrawl window: {:?}", config.crawler.recrawl_window());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, StoreConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
