//! Configuration module for hopper
//!
//! This module handles loading, parsing, and validating crawl configuration,
//! either assembled in code or loaded from a TOML file.
//!
//! # Example
//!
//! ```no_run
//! use hopper::config::{load_config, validate};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hopper.toml")).unwrap();
//! validate(&config).unwrap();
//! ```

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{
    CrawlConfig, DEFAULT_DELAY_MS, DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MEDIATYPE,
    DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
pub use validation::validate;
