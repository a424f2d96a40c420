//! Observer hooks for watching a crawl
//!
//! Hooks are called synchronously from worker tasks and must not block for
//! long. All of them default to no-ops, so an observer only implements the
//! transitions it cares about. The `on_response` hook receives the bounded
//! body and is the delivery point for callers that want to store non-HTML
//! media admitted by the `mediatype` option.

use scraper::Html;

use crate::crawler::ResponseView;
use crate::request::Request;
use crate::ErrorKind;

/// Callbacks for the request lifecycle
pub trait Observer: Send + Sync {
    /// Called before a candidate request is offered for admission
    fn on_admit(&self, _req: &Request) {}

    /// Called after the filters pass, before the fetch starts
    fn on_request(&self, _req: &Request) {}

    /// Called after a successful fetch, before any parsing
    fn on_response(&self, _req: &Request, _res: &ResponseView) {}

    /// Called after the body was parsed as HTML
    fn on_parse(&self, _req: &Request, _res: &ResponseView, _doc: &Html) {}

    /// Called for every per-request failure
    fn on_error(&self, _req: &Request, _kind: &ErrorKind) {}
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Observer that logs events through `tracing`
///
/// Used by the CLI; successful transitions log at info/debug, failures at
/// warn.
#[derive(Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_request(&self, req: &Request) {
        tracing::info!("Fetching {} (depth {})", req.url(), req.depth());
    }

    fn on_response(&self, req: &Request, res: &ResponseView) {
        tracing::debug!(
            "Got {} from {} ({} bytes)",
            res.status,
            req.url(),
            res.body.len()
        );
    }

    fn on_error(&self, req: &Request, kind: &ErrorKind) {
        tracing::warn!("{}: {}", req.url(), kind);
    }
}
