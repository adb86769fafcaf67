//! Configuration module for Media-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line values are layered on top with [`apply_overrides`].
//!
//! # Example
//!
//! ```no_run
//! use media_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Collecting up to {} notes per keyword", config.crawler.max_notes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlerConfig, LoginConfig, OutputConfig, PlatformConfig, RedisConfig,
    ReplyConfig,
};

// Re-export parser functions
pub use parser::{apply_overrides, compute_config_hash, load_config, load_config_with_hash, Overrides};
pub use validation::validate;
