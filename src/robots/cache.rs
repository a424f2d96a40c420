//! Per-host robots.txt cache
//!
//! Each host's policy is fetched at most once per crawl through a per-host
//! [`OnceCell`]: concurrent workers hitting the same cold host coalesce on
//! one fetch. Entries live for the lifetime of the cache; a fetch failure
//! is cached as a permissive policy so unreachable hosts are not re-queried
//! per request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OnceCell;
use url::Url;

use crate::crawler::Fetcher;
use crate::frontier::Frontier;
use crate::robots::RobotsPolicy;
use crate::url::host_of;

/// Cached, resolved robots state for one host
///
/// The crawl delay for the crawler's own user agent is resolved once at
/// construction; other agents are resolved on demand from the raw policy.
#[derive(Debug)]
pub struct RobotsEntry {
    policy: RobotsPolicy,
    default_agent: String,
    default_delay: Option<Duration>,
}

impl RobotsEntry {
    /// Builds an entry, pre-resolving the delay for `default_agent`
    pub fn new(policy: RobotsPolicy, default_agent: &str) -> Self {
        let default_delay = policy.crawl_delay(default_agent);
        Self {
            policy,
            default_agent: default_agent.to_string(),
            default_delay,
        }
    }

    /// Whether the given agent may fetch the path
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        self.policy.is_allowed(path, user_agent)
    }

    /// The declared crawl delay for the agent, if any
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if user_agent == self.default_agent {
            self.default_delay
        } else {
            self.policy.crawl_delay(user_agent)
        }
    }
}

/// Process-wide robots.txt cache
pub struct RobotsCache {
    user_agent: String,
    default_delay: Duration,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<RobotsEntry>>>>>,
}

impl RobotsCache {
    /// Creates an empty cache for the given default agent and crawl delay
    pub fn new(user_agent: &str, default_delay: Duration) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            default_delay,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the robots entry for the URL's host, fetching it on first use
    ///
    /// A cold host triggers one `GET <scheme>://<host>/robots.txt` through
    /// the fetcher (the filter pipeline is bypassed so robots.txt does not
    /// recurse into itself). Before the fetch is accounted against the
    /// host's bucket, any declared crawl delay is adopted as
    /// `max(configured delay, Crawl-delay)`, so the host's next dispatch
    /// already honors it.
    pub async fn policy_for(
        &self,
        url: &Url,
        fetcher: &Fetcher,
        frontier: &Frontier,
    ) -> Arc<RobotsEntry> {
        let host = host_of(url).unwrap_or_default();

        let cell = {
            let mut entries = self.entries.lock().expect("robots cache lock poisoned");
            Arc::clone(entries.entry(host.clone()).or_default())
        };

        cell.get_or_init(|| async {
            let policy = match fetcher.fetch_robots(&robots_url(url)).await {
                Some(body) => RobotsPolicy::parse(&body),
                None => RobotsPolicy::permissive(),
            };
            let entry = RobotsEntry::new(policy, &self.user_agent);

            if let Some(robots_delay) = entry.crawl_delay(&self.user_agent) {
                frontier.set_host_delay(&host, robots_delay.max(self.default_delay));
            }
            frontier.record_fetch(&host);

            Arc::new(entry)
        })
        .await
        .clone()
    }
}

/// The robots.txt location for the host serving `url`
fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}
