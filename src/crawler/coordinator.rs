//! Crawl coordination
//!
//! The [`Crawler`] owns the frontier, the fetcher, the robots cache, and
//! the observer, and drives the whole crawl: admit the seeds, release the
//! frontier, spawn a bounded pool of workers, and wait for the drain. Each
//! worker loops one request at a time through
//! filter → fetch → parse → discover → admit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::config::{self, CrawlConfig};
use crate::crawler::parser::{extract_links, parse_document};
use crate::crawler::{filter, FetchOutcome, Fetcher};
use crate::frontier::{AdmitOutcome, Frontier};
use crate::observer::{NoopObserver, Observer};
use crate::request::{Request, Scope};
use crate::robots::RobotsCache;
use crate::url::canonicalize;
use crate::{ErrorKind, Result};

/// Maximum consecutive redirect hops before a chain is cut off
const MAX_REDIRECTS: u32 = 10;

/// Counters describing a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Canonical URLs admitted to the frontier (seeds included)
    pub admitted: usize,

    /// Requests that completed a fetch with a 2xx response
    pub fetched: usize,

    /// Per-request failures of any kind
    pub errors: usize,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

/// Handle for stopping a running crawl
///
/// Cheap to clone; typically wired to a signal handler. Shutting down
/// closes the frontier: workers finish the request they hold and exit,
/// pending requests are abandoned.
#[derive(Clone)]
pub struct CrawlHandle {
    frontier: Arc<Frontier>,
}

impl CrawlHandle {
    /// Stops the crawl
    pub fn shutdown(&self) {
        self.frontier.shutdown();
    }
}

/// A configured crawl, ready to run
pub struct Crawler {
    config: CrawlConfig,
    scope: Scope,
    frontier: Arc<Frontier>,
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsCache>,
    observer: Arc<dyn Observer>,
    fetched: AtomicUsize,
    errors: AtomicUsize,
}

impl Crawler {
    /// Builds a crawler from a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration; validated here
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(HopperError)` - Invalid configuration or HTTP client failure
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config::validate(&config)?;

        let fetcher = Fetcher::new(&config)?;
        let frontier = Frontier::new(config.delay());
        let robots = RobotsCache::new(&config.user_agent, config.delay());
        let scope = config.scope();

        Ok(Self {
            config,
            scope,
            frontier: Arc::new(frontier),
            fetcher: Arc::new(fetcher),
            robots: Arc::new(robots),
            observer: Arc::new(NoopObserver),
            fetched: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    /// Replaces the observer
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns a handle that can stop this crawl
    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            frontier: Arc::clone(&self.frontier),
        }
    }

    /// Runs the crawl to completion
    ///
    /// Admits the seeds, spawns the worker pool, and returns once the
    /// frontier has drained (or [`CrawlHandle::shutdown`] closed it). All
    /// per-request failures are routed to the observer; only setup problems
    /// surface as errors here. A panicking worker propagates its panic.
    pub async fn run(self) -> Result<CrawlStats> {
        let started = Instant::now();
        let crawler = Arc::new(self);

        for seed in crawler.config.seeds.clone() {
            match Request::seed(&seed, crawler.scope.clone()) {
                Ok(req) => crawler.admit(req),
                // Unreachable after validation, but a seed is not worth a panic
                Err(kind) => tracing::error!("Skipping seed {}: {}", seed, kind),
            }
        }
        crawler.frontier.start_draining();

        tracing::info!(
            "Starting crawl: {} seed(s), {} worker(s), {:?} default delay",
            crawler.config.seeds.len(),
            crawler.config.concurrency,
            crawler.config.delay()
        );

        let mut workers = JoinSet::new();
        for id in 0..crawler.config.concurrency {
            let crawler = Arc::clone(&crawler);
            workers.spawn(async move { crawler.work(id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }

        let abandoned = crawler.frontier.pending_count();
        if abandoned > 0 {
            tracing::info!("Shut down with {} pending request(s) abandoned", abandoned);
        }

        let stats = CrawlStats {
            admitted: crawler.frontier.seen_count(),
            fetched: crawler.fetched.load(Ordering::Relaxed),
            errors: crawler.errors.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Crawl finished: {} admitted, {} fetched, {} errors in {:?}",
            stats.admitted,
            stats.fetched,
            stats.errors,
            stats.elapsed
        );
        Ok(stats)
    }

    /// One worker: drain the frontier until it closes
    async fn work(&self, id: usize) {
        while let Some(req) = self.frontier.take_next().await {
            self.process(req).await;
            self.frontier.complete();
        }
        tracing::debug!("Worker {} exiting", id);
    }

    /// Drives one request through its lifecycle
    async fn process(&self, req: Request) {
        if let Err(kind) = self.check_filters(&req).await {
            return self.report(&req, kind);
        }

        self.observer.on_request(&req);

        let outcome = match self.fetcher.fetch(&req).await {
            Ok(outcome) => outcome,
            Err(kind) => return self.report(&req, kind),
        };

        match outcome {
            FetchOutcome::Redirect { status, location } => {
                self.follow_redirect(&req, status, &location);
            }
            FetchOutcome::Skipped { content_type } => {
                self.fetched.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Not parsing {} ({})", req.url(), content_type);
            }
            FetchOutcome::Response(view) => {
                self.fetched.fetch_add(1, Ordering::Relaxed);
                self.observer.on_response(&req, &view);

                if !view.is_html() {
                    // Non-HTML body with the configured mediatype: delivered
                    // via on_response above, nothing to parse
                    return;
                }

                let text = match std::str::from_utf8(&view.body) {
                    Ok(text) => text,
                    Err(e) => return self.report(&req, ErrorKind::ParseError(e.to_string())),
                };

                let links = {
                    let doc = parse_document(text);
                    self.observer.on_parse(&req, &view, &doc);
                    extract_links(&doc, req.url())
                };

                for url in links {
                    self.admit(req.derived(url));
                }
            }
        }
    }

    /// Filter pipeline: scheme, depth, domain lists, then robots.txt
    async fn check_filters(&self, req: &Request) -> std::result::Result<(), ErrorKind> {
        filter::check(req)?;

        let policy = self
            .robots
            .policy_for(req.url(), &self.fetcher, &self.frontier)
            .await;
        if !policy.is_allowed(req.url().path(), &self.config.user_agent) {
            return Err(ErrorKind::RobotsExcluded(req.url().to_string()));
        }

        Ok(())
    }

    /// Re-admits a redirect target so it passes dedup and politeness again
    fn follow_redirect(&self, req: &Request, status: u16, location: &str) {
        tracing::debug!("{} from {} to {}", status, req.url(), location);

        let target = match canonicalize(location, Some(req.url())) {
            Ok(target) => target,
            Err(kind) => return self.report(req, kind),
        };

        if target == *req.url() {
            return self.report(req, ErrorKind::InfiniteRedirect(target.to_string()));
        }
        if req.redirects() + 1 > MAX_REDIRECTS {
            return self.report(req, ErrorKind::RedirectLimitExceeded(MAX_REDIRECTS));
        }

        self.admit(req.redirected(target));
    }

    /// Offers a request to the frontier, reporting rejections
    fn admit(&self, req: Request) {
        self.observer.on_admit(&req);
        match self.frontier.admit(req) {
            AdmitOutcome::Admitted | AdmitOutcome::Duplicate => {}
            AdmitOutcome::Rejected { request, reason } => {
                tracing::debug!("Not admitting {}: {}", request.url(), reason);
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.observer.on_error(&request, &reason);
            }
        }
    }

    /// Records and reports a per-request failure
    fn report(&self, req: &Request, kind: ErrorKind) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("{}: {}", req.url(), kind);
        self.observer.on_error(req, &kind);
    }
}
