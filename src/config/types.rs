use std::time::Duration;

use serde::Deserialize;

use crate::request::Scope;

/// Default HTTP `User-Agent`, also used as the robots.txt agent key
pub const DEFAULT_USER_AGENT: &str = "hopper/0.1";

/// Default minimum gap between dispatches to the same host
pub const DEFAULT_DELAY_MS: u64 = 15_000;

/// Default per-request fetch timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default cap on body bytes read per response
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 4_000_000;

/// Default media type delivered to the response observer
pub const DEFAULT_MEDIATYPE: &str = "text/html";

/// Crawl configuration
///
/// Deserializable from a TOML file with kebab-case keys; every field has a
/// default so a config file (or a programmatic config) only needs to name
/// what it changes. Seeds are the one thing a crawl cannot run without,
/// which [`validate`](crate::config::validate) enforces.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Absolute URLs admitted before the workers start
    pub seeds: Vec<String>,

    /// HTTP `User-Agent` header and robots.txt agent key
    pub user_agent: String,

    /// Maximum number of concurrent workers
    pub concurrency: usize,

    /// Default minimum gap between dispatches to the same host (milliseconds)
    pub delay_ms: u64,

    /// Per-request fetch timeout (milliseconds)
    pub timeout_ms: u64,

    /// If non-empty, only these hosts are crawled (wildcards allowed)
    pub allowed_domains: Vec<String>,

    /// These hosts are never crawled (wildcards allowed)
    pub disallowed_domains: Vec<String>,

    /// Maximum derivation depth from any seed; `None` means unbounded
    pub allowed_depth: Option<usize>,

    /// Maximum body bytes read per response
    pub max_content_length: u64,

    /// Media type delivered to `on_response` in addition to HTML parsing
    pub mediatype: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrency: num_cpus::get(),
            delay_ms: DEFAULT_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            allowed_domains: Vec::new(),
            disallowed_domains: Vec::new(),
            allowed_depth: None,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            mediatype: DEFAULT_MEDIATYPE.to_string(),
        }
    }
}

impl CrawlConfig {
    /// Returns the default per-host delay as a [`Duration`]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Returns the per-request fetch timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Builds the static filter record shared by every request of this crawl
    pub fn scope(&self) -> Scope {
        Scope {
            allowed_domains: self.allowed_domains.clone().into(),
            disallowed_domains: self.disallowed_domains.clone().into(),
            allowed_depth: self.allowed_depth,
            max_content_length: self.max_content_length,
        }
    }
}
