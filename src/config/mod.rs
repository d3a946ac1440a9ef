//! Configuration module for the price crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Settings are read once at startup and never reloaded mid-run.
//!
//! # Example
//!
//! ```no_run
//! use repair_price_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawling {}", config.crawler.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
