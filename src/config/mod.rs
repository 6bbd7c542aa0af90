//! Configuration module for ShadowGraph
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shadowgraph::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shadowgraph.toml")).unwrap();
//! println!("API will listen on {}", config.server.bind_address);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AccountEntry, Config, CrawlerConfig, JobsConfig, LimitEntry, LoginConfig, OverlapPolicy,
    RouteLimitEntry, SchedulesConfig, ServerConfig, StorageConfig, ThrottleConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
