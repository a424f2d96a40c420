//! robots.txt handling module
//!
//! Fetching, parsing, and per-host caching of robots.txt policies,
//! including `Crawl-delay` adoption into the frontier's politeness state.

mod cache;
mod parser;

pub use cache::{RobotsCache, RobotsEntry};
pub use parser::RobotsPolicy;
