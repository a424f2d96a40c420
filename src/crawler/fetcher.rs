//! HTTP fetcher adapter
//!
//! Wraps the `reqwest` client for the crawl workers:
//! - Default headers (notably `User-Agent`) merged under per-request ones
//! - Redirects are never followed by the transport; 3xx responses surface
//!   as [`FetchOutcome::Redirect`] so the target re-enters admission and
//!   politeness
//! - The `Content-Type` header is inspected before the body is touched and
//!   unwanted media types are skipped without reading
//! - Body reads are streamed and bounded by the request's content-length cap

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use url::Url;

use crate::config::CrawlConfig;
use crate::request::Request;
use crate::ErrorKind;

/// A fetched response with its bounded body
#[derive(Debug, Clone)]
pub struct ResponseView {
    /// The URL that was fetched
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Raw `Content-Type` header value, if any
    pub content_type: Option<String>,

    /// Body bytes, at most the request's content-length cap
    pub body: Vec<u8>,
}

impl ResponseView {
    /// The media type: `Content-Type` up to any parameters, trimmed
    pub fn media_type(&self) -> Option<&str> {
        media_type_of(self.content_type.as_deref())
    }

    /// Whether the body is HTML (a missing `Content-Type` counts as HTML,
    /// since many small servers omit the header)
    pub fn is_html(&self) -> bool {
        match self.media_type() {
            Some(media) => media.eq_ignore_ascii_case("text/html"),
            None => true,
        }
    }
}

/// Result of one fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with an accepted media type; body was read
    Response(ResponseView),

    /// 3xx response; the target has NOT been fetched
    Redirect { status: u16, location: String },

    /// 2xx response with an unwanted media type; body was not read
    Skipped { content_type: String },
}

/// HTTP client wrapper used by workers and the robots cache
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    mediatype: String,
}

impl Fetcher {
    /// Builds the fetcher and its HTTP client from the crawl configuration
    ///
    /// The client never follows redirects on its own; the scheduler decides
    /// what happens to a `Location` target.
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let mut default_headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            default_headers.insert(USER_AGENT, agent);
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            mediatype: config.mediatype.clone(),
        })
    }

    /// Performs one bounded fetch for a crawl request
    ///
    /// Per-request headers override the client defaults. The body is read
    /// only for `text/html` and the configured mediatype, in chunks, and
    /// aborted with [`ErrorKind::BodyTooLarge`] once it would exceed the
    /// request's cap. An announced `Content-Length` above the cap fails
    /// before any body bytes are transferred.
    pub async fn fetch(&self, req: &Request) -> Result<FetchOutcome, ErrorKind> {
        let response = self
            .client
            .request(req.method().clone(), req.url().clone())
            .headers(req.headers().clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();

        if status.is_redirection() {
            return match header_str(response.headers(), LOCATION) {
                Some(location) => Ok(FetchOutcome::Redirect {
                    status: status.as_u16(),
                    location,
                }),
                // A redirect without a target is just a bad response
                None => Err(ErrorKind::BadStatus(status.as_u16())),
            };
        }

        if !status.is_success() {
            return Err(ErrorKind::BadStatus(status.as_u16()));
        }

        let content_type = header_str(response.headers(), CONTENT_TYPE);
        if !self.accepts(content_type.as_deref()) {
            return Ok(FetchOutcome::Skipped {
                content_type: content_type.unwrap_or_default(),
            });
        }

        let max_bytes = req.scope().max_content_length;
        if let Some(announced) = response.content_length() {
            if announced > max_bytes {
                return Err(ErrorKind::BodyTooLarge(max_bytes));
            }
        }

        let body = read_bounded(response, max_bytes).await?;

        Ok(FetchOutcome::Response(ResponseView {
            url: req.url().clone(),
            status: status.as_u16(),
            content_type,
            body,
        }))
    }

    /// Fetches a robots.txt body, treating every failure as absence
    ///
    /// Bypasses the filter pipeline; the caller accounts the fetch against
    /// the host's politeness state.
    pub async fn fetch_robots(&self, robots_url: &Url) -> Option<String> {
        let response = self
            .client
            .get(robots_url.clone())
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::debug!("Failed to read robots.txt from {}: {}", robots_url, e);
                    None
                }
            },
            Ok(response) => {
                tracing::debug!(
                    "No robots.txt at {} (status {})",
                    robots_url,
                    response.status()
                );
                None
            }
            Err(e) => {
                tracing::debug!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                None
            }
        }
    }

    /// Whether a response with this `Content-Type` should have its body read
    fn accepts(&self, content_type: Option<&str>) -> bool {
        match media_type_of(content_type) {
            Some(media) => {
                media.eq_ignore_ascii_case("text/html")
                    || media.eq_ignore_ascii_case(&self.mediatype)
            }
            // No Content-Type: assume HTML rather than drop the page
            None => true,
        }
    }
}

/// Reads a response body in chunks, stopping once it would exceed `max_bytes`
async fn read_bounded(mut response: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>, ErrorKind> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ErrorKind::BodyReadError(e.to_string()))?
    {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(ErrorKind::BodyTooLarge(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Maps a transport error to its typed kind
fn classify(e: reqwest::Error) -> ErrorKind {
    if e.is_timeout() {
        ErrorKind::FetchTimeout
    } else {
        ErrorKind::FetchNetwork(e.to_string())
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Extracts the bare media type from a `Content-Type` value
fn media_type_of(content_type: Option<&str>) -> Option<&str> {
    let value = content_type?.split(';').next()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
