//! Crawl requests and their derivation
//!
//! A [`Request`] is an immutable record of one unit of crawl work. Requests
//! are created either from a seed URL or derived from a parent request when
//! a link (or redirect target) is discovered; derivation increments the
//! depth and copies the parent's [`Scope`] so the filter context travels
//! with the request without any shared mutable state.

use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

use crate::url::{canonicalize, host_of};
use crate::ErrorKind;

/// Static filter context shared by a request and its derivations
///
/// One `Scope` is built per crawl from the configuration and shallow-copied
/// onto every derived request. The domain lists sit behind `Arc` slices so
/// the copy is cheap.
#[derive(Debug, Clone)]
pub struct Scope {
    /// If non-empty, only these hosts are admitted (wildcards allowed)
    pub allowed_domains: std::sync::Arc<[String]>,

    /// These hosts are never admitted (wildcards allowed)
    pub disallowed_domains: std::sync::Arc<[String]>,

    /// Maximum derivation depth; `None` means unbounded
    pub allowed_depth: Option<usize>,

    /// Maximum body bytes read for this request
    pub max_content_length: u64,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new().into(),
            disallowed_domains: Vec::new().into(),
            allowed_depth: None,
            max_content_length: crate::config::DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// One unit of crawl work
///
/// The URL is always canonical (absolute, fragment-stripped, http(s)), so
/// its string form doubles as the admission key.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    depth: usize,
    redirects: u32,
    headers: HeaderMap,
    scope: Scope,
}

impl Request {
    /// Creates a seed request at depth 0
    ///
    /// # Arguments
    ///
    /// * `raw` - An absolute URL string
    /// * `scope` - The crawl's filter context
    ///
    /// # Returns
    ///
    /// * `Ok(Request)` - Canonicalized seed request
    /// * `Err(ErrorKind)` - `InvalidUrl` or `SchemeUnsupported`
    pub fn seed(raw: &str, scope: Scope) -> Result<Self, ErrorKind> {
        let url = canonicalize(raw, None)?;
        Ok(Self {
            method: Method::GET,
            url,
            depth: 0,
            redirects: 0,
            headers: HeaderMap::new(),
            scope,
        })
    }

    /// Derives a request for a link discovered on this request's page
    ///
    /// Depth increases by one; the redirect counter resets, since an
    /// ordinary link starts a fresh chain. The URL must already be
    /// canonical (the link extractor produces such URLs).
    pub fn derived(&self, url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            depth: self.depth + 1,
            redirects: 0,
            headers: self.headers.clone(),
            scope: self.scope.clone(),
        }
    }

    /// Derives a request for a redirect target of this request
    ///
    /// Like [`derived`](Self::derived), but the redirect counter carries
    /// over and increments so that long chains can be cut off.
    pub fn redirected(&self, url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            depth: self.depth + 1,
            redirects: self.redirects + 1,
            headers: self.headers.clone(),
            scope: self.scope.clone(),
        }
    }

    /// The HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The canonical URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The host this request is bucketed under (includes any explicit port)
    pub fn host(&self) -> String {
        host_of(&self.url).unwrap_or_default()
    }

    /// Derivation depth: 0 for seeds
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Consecutive redirect hops that led to this request
    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    /// Per-request headers, merged over the fetcher's defaults at fetch time
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the per-request headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The filter context
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The admission key for this request's URL
    pub fn canonical_key(&self) -> &str {
        self.url.as_str()
    }
}
