//! End-to-end crawl tests
//!
//! These tests run full crawls against wiremock servers and assert on the
//! dispatch sequence recorded by an observer: which URLs were fetched, in
//! what order, with which per-host gaps, and which error kinds surfaced.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use hopper::url::host_of;
use hopper::{CrawlConfig, Crawler, ErrorKind, Observer, Request, ResponseView};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Observer that records dispatches, responses, and errors
#[derive(Default)]
struct Recorder {
    dispatches: Mutex<Vec<(Url, Instant)>>,
    responses: Mutex<Vec<(Url, Option<String>, usize)>>,
    errors: Mutex<Vec<(Url, ErrorKind)>>,
}

impl Observer for Recorder {
    fn on_request(&self, req: &Request) {
        self.dispatches
            .lock()
            .unwrap()
            .push((req.url().clone(), Instant::now()));
    }

    fn on_response(&self, req: &Request, res: &ResponseView) {
        self.responses.lock().unwrap().push((
            req.url().clone(),
            res.content_type.clone(),
            res.body.len(),
        ));
    }

    fn on_error(&self, req: &Request, kind: &ErrorKind) {
        self.errors
            .lock()
            .unwrap()
            .push((req.url().clone(), kind.clone()));
    }
}

impl Recorder {
    fn dispatched_paths(&self) -> Vec<String> {
        self.dispatches
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.path().to_string())
            .collect()
    }

    fn error_kinds(&self) -> Vec<ErrorKind> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .map(|(_, kind)| kind.clone())
            .collect()
    }

    /// Smallest gap between successive dispatches to the same host
    fn min_same_host_gap(&self) -> Option<Duration> {
        let dispatches = self.dispatches.lock().unwrap();
        let mut min_gap: Option<Duration> = None;

        for (i, (url_a, at_a)) in dispatches.iter().enumerate() {
            for (url_b, at_b) in dispatches.iter().skip(i + 1) {
                if host_of(url_a) != host_of(url_b) {
                    continue;
                }
                let gap = at_b.duration_since(*at_a);
                min_gap = Some(match min_gap {
                    Some(current) => current.min(gap),
                    None => gap,
                });
                break;
            }
        }

        min_gap
    }
}

fn test_config(seeds: Vec<String>) -> CrawlConfig {
    CrawlConfig {
        seeds,
        concurrency: 2,
        delay_ms: 100,
        timeout_ms: 5000,
        ..CrawlConfig::default()
    }
}

async fn run_crawl(config: CrawlConfig) -> (std::sync::Arc<Recorder>, hopper::CrawlStats) {
    let recorder = std::sync::Arc::new(Recorder::default());
    let crawler = Crawler::new(config)
        .expect("config should be valid")
        .with_observer(recorder.clone());
    let stats = crawler.run().await.expect("crawl should complete");
    (recorder, stats)
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, at: &str, body: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html_page(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_site_fan_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        r##"<a href="/link1">1</a>
            <a href="/link2">2</a>
            <a href="#">top</a>
            <a href="javascript:void(0)">js</a>"##,
        1,
    )
    .await;
    mount_page(&server, "/link1", "no links here", 1).await;
    mount_page(&server, "/link2", "no links here", 1).await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/", server.uri())])).await;

    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/", "/link1", "/link2"]);
    assert_eq!(stats.fetched, 3);

    // The two invalid anchors produced no dispatches and no admissions
    assert_eq!(stats.admitted, 3);
    assert!(recorder.error_kinds().is_empty());

    // Same-host dispatches honored the 100ms gap
    let gap = recorder.min_same_host_gap().expect("multiple dispatches");
    assert!(gap >= Duration::from_millis(90), "gap was {:?}", gap);
}

#[tokio::test]
async fn test_cross_host_allow_list() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    mount_page(
        &server_a,
        "/cross",
        &format!(
            r#"<a href="{a}/link1">a1</a>
               <a href="{a}/link2">a2</a>
               <a href="{b}/link1">b1</a>
               <a href="{b}/link2">b2</a>"#,
            a = server_a.uri(),
            b = server_b.uri()
        ),
        1,
    )
    .await;
    mount_page(&server_a, "/link1", "", 1).await;
    mount_page(&server_a, "/link2", "", 1).await;

    // Host B must never see a request
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server_b)
        .await;

    let host_a = host_of(&Url::parse(&server_a.uri()).unwrap()).unwrap();
    let mut config = test_config(vec![format!("{}/cross", server_a.uri())]);
    config.allowed_domains = vec![host_a];

    let (recorder, stats) = run_crawl(config).await;

    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/cross", "/link1", "/link2"]);
    assert_eq!(stats.fetched, 3);

    let filtered = recorder
        .error_kinds()
        .into_iter()
        .filter(|kind| matches!(kind, ErrorKind::DomainFiltered(_)))
        .count();
    assert_eq!(filtered, 2);
}

#[tokio::test]
async fn test_robots_exclusion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-Agent: *\nDisallow: /excluded1\nDisallow: /excluded2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/robot",
        r#"<a href="/excluded1">x</a>
           <a href="/link1">ok</a>
           <a href="/excluded2">y</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/link1", "", 1).await;
    mount_page(&server, "/excluded1", "", 0).await;
    mount_page(&server, "/excluded2", "", 0).await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/robot", server.uri())])).await;

    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/link1", "/robot"]);
    assert_eq!(stats.fetched, 2);

    let excluded = recorder
        .error_kinds()
        .into_iter()
        .filter(|kind| matches!(kind, ErrorKind::RobotsExcluded(_)))
        .count();
    assert_eq!(excluded, 2);
}

#[tokio::test]
async fn test_robots_crawl_delay_override() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-Agent: *\nCrawl-Delay: 1"))
        .mount(&server)
        .await;

    mount_page(&server, "/a", r#"<a href="/b">next</a>"#, 1).await;
    mount_page(&server, "/b", "", 1).await;

    // Crawler default is 100ms; robots declares 1s, which must win
    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/a", server.uri())])).await;

    assert_eq!(stats.fetched, 2);
    let gap = recorder.min_same_host_gap().expect("two dispatches");
    assert!(gap >= Duration::from_millis(950), "gap was {:?}", gap);
}

#[tokio::test]
async fn test_single_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/link1"))
        .expect(1)
        .mount(&server)
        .await;

    // The target links back to itself; the seen-set keeps it to one fetch
    mount_page(&server, "/link1", r#"<a href="/link1">self</a>"#, 1).await;

    let (recorder, stats) =
        run_crawl(test_config(vec![format!("{}/redirect", server.uri())])).await;

    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/link1", "/redirect"]);
    assert_eq!(stats.admitted, 2);
    assert!(recorder.error_kinds().is_empty());
}

#[tokio::test]
async fn test_infinite_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/loop"))
        .expect(1)
        .mount(&server)
        .await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/loop", server.uri())])).await;

    assert_eq!(recorder.dispatched_paths(), ["/loop"]);
    assert_eq!(
        recorder
            .error_kinds()
            .into_iter()
            .filter(|kind| matches!(kind, ErrorKind::InfiniteRedirect(_)))
            .count(),
        1
    );
    assert_eq!(stats.admitted, 1);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/level1">1</a>"#, 1).await;
    mount_page(&server, "/level1", r#"<a href="/level2">2</a>"#, 1).await;
    mount_page(&server, "/level2", r#"<a href="/level3">3</a>"#, 1).await;
    mount_page(&server, "/level3", "", 0).await;

    let mut config = test_config(vec![format!("{}/", server.uri())]);
    config.allowed_depth = Some(2);

    let (recorder, stats) = run_crawl(config).await;

    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/", "/level1", "/level2"]);
    assert_eq!(stats.fetched, 3);

    assert_eq!(
        recorder
            .error_kinds()
            .into_iter()
            .filter(|kind| matches!(kind, ErrorKind::DepthExceeded(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_non_html_body_not_parsed() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/document.pdf">pdf</a>"#, 1).await;

    Mock::given(method("GET"))
        .and(path("/document.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x25, 0x50, 0x44, 0x46])
                .insert_header("content-type", "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/", server.uri())])).await;

    // The PDF is dispatched but its body is skipped, not delivered
    let mut paths = recorder.dispatched_paths();
    paths.sort();
    assert_eq!(paths, ["/", "/document.pdf"]);
    assert_eq!(stats.fetched, 2);

    let response_paths: Vec<String> = recorder
        .responses
        .lock()
        .unwrap()
        .iter()
        .map(|(url, _, _)| url.path().to_string())
        .collect();
    assert_eq!(response_paths, ["/"]);
}

#[tokio::test]
async fn test_configured_mediatype_delivered() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/data.json">data</a>"#, 1).await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"ok":true}"#)
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(vec![format!("{}/", server.uri())]);
    config.mediatype = "application/json".to_string();

    let (recorder, _stats) = run_crawl(config).await;

    let responses = recorder.responses.lock().unwrap();
    let json = responses
        .iter()
        .find(|(url, _, _)| url.path() == "/data.json")
        .expect("json body delivered to observer");
    assert_eq!(json.1.as_deref(), Some("application/json"));
    assert_eq!(json.2, r#"{"ok":true}"#.len());
}

#[tokio::test]
async fn test_body_too_large() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/big">big</a>"#, 1).await;

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("x".repeat(4096))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let mut config = test_config(vec![format!("{}/", server.uri())]);
    config.max_content_length = 1024;

    let (recorder, _stats) = run_crawl(config).await;

    assert_eq!(
        recorder
            .error_kinds()
            .into_iter()
            .filter(|kind| matches!(kind, ErrorKind::BodyTooLarge(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_seed_disallowed_by_robots() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-Agent: *\nDisallow: /"))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(&server, "/", "", 0).await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/", server.uri())])).await;

    // The seed is rejected after the robots policy resolves; the crawl
    // drains immediately.
    assert!(recorder.dispatched_paths().is_empty());
    assert_eq!(stats.fetched, 0);
    assert_eq!(
        recorder
            .error_kinds()
            .into_iter()
            .filter(|kind| matches!(kind, ErrorKind::RobotsExcluded(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_bad_status_reported_and_crawl_continues() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/missing">gone</a><a href="/link1">ok</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/link1", "", 1).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (recorder, stats) = run_crawl(test_config(vec![format!("{}/", server.uri())])).await;

    assert_eq!(stats.fetched, 2);
    assert!(recorder.error_kinds().contains(&ErrorKind::BadStatus(404)));
}
