//! robots.txt policy
//!
//! Path matching is delegated to the `robotstxt` crate's matcher; the
//! `Crawl-delay` directive is parsed by hand since the matcher does not
//! expose it.

use std::time::Duration;

use robotstxt::DefaultMatcher;

/// Parsed robots.txt content for one host
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content
    content: String,
    /// True for the policy used when no robots.txt could be fetched
    allow_all: bool,
}

impl RobotsPolicy {
    /// Wraps raw robots.txt content
    pub fn parse(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// A policy that allows every path and declares no delay
    ///
    /// Used when robots.txt is absent or unfetchable, so the host is not
    /// re-queried on every request.
    pub fn permissive() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks whether a path may be fetched by the given user agent
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, path)
    }

    /// Extracts the `Crawl-delay` for the given user agent
    ///
    /// A group naming the agent specifically wins over a wildcard group.
    /// Agent matching is the usual case-insensitive substring test; a
    /// `User-agent` line after any other directive starts a new group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut last_was_agent = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut specific_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !last_was_agent {
                        group_agents.clear();
                    }
                    group_agents.push(value.to_lowercase());
                    last_was_agent = true;
                }
                "crawl-delay" => {
                    last_was_agent = false;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if !seconds.is_finite() || seconds < 0.0 {
                        continue;
                    }
                    if group_agents
                        .iter()
                        .any(|ua| ua != "*" && agent.contains(ua.as_str()))
                    {
                        specific_delay = Some(seconds);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard_delay = Some(seconds);
                    }
                }
                _ => {
                    last_was_agent = false;
                }
            }
        }

        specific_delay
            .or(wildcard_delay)
            .map(Duration::from_secs_f64)
    }
}
