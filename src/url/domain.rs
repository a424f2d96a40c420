use url::Url;

/// Extracts the host from a URL
///
/// Returns the lowercase host portion including any port, matching how
/// requests are partitioned into host buckets. HTTP(S) URLs always have a
/// host, so `None` only occurs for URLs that never pass canonicalization.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use hopper::url::host_of;
///
/// let url = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(host_of(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_of(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_of(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
