//! Configuration module for the review crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; the crawler runs with defaults when no file is given.
//!
//! # Example
//!
//! ```no_run
//! use review_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Writing chunks of {} reviews", config.output.chunk_size);
//! ```

mod parser;
mod types;
pub mod validation;

// Re-export types
pub use types::{ApiConfig, Config, CrawlConfig, OutputConfig, RetryConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
