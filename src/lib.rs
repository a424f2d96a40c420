//! Hopper: a polite, concurrent web crawler
//!
//! Given one or more seed URLs, hopper discovers reachable pages by fetching
//! HTTP(S) resources, extracting outbound links from HTML, and recursively
//! visiting them under configurable filters (domain allow/deny lists, depth
//! bound, content-size cap) while honoring robots.txt exclusions and
//! per-host crawl delays.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod observer;
pub mod request;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for hopper operations
#[derive(Debug, Error)]
pub enum HopperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),
}

/// Typed reason for a request being filtered, rejected, or failed.
///
/// Every per-request failure is reported through
/// [`Observer::on_error`](crate::observer::Observer::on_error) with one of
/// these kinds and is never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported scheme: {0}")]
    SchemeUnsupported(String),

    #[error("Depth {0} exceeds the allowed depth")]
    DepthExceeded(usize),

    #[error("Host filtered by domain lists: {0}")]
    DomainFiltered(String),

    #[error("Excluded by robots.txt: {0}")]
    RobotsExcluded(String),

    #[error("Request timed out")]
    FetchTimeout,

    #[error("Network error: {0}")]
    FetchNetwork(String),

    #[error("Redirect loop detected at {0}")]
    InfiniteRedirect(String),

    #[error("Redirect chain exceeded {0} hops")]
    RedirectLimitExceeded(u32),

    #[error("Unexpected status code: {0}")]
    BadStatus(u16),

    #[error("Body exceeds the maximum content length of {0} bytes")]
    BodyTooLarge(u64),

    #[error("Failed to read body: {0}")]
    BodyReadError(String),

    #[error("Failed to parse body: {0}")]
    ParseError(String),

    #[error("Crawler is shutting down")]
    ShuttingDown,
}

/// Result type alias for hopper operations
pub type Result<T> = std::result::Result<T, HopperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{CrawlHandle, CrawlStats, Crawler, FetchOutcome, ResponseView};
pub use frontier::{AdmitOutcome, Frontier};
pub use observer::{LogObserver, Observer};
pub use request::{Request, Scope};
