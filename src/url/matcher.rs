/// Checks if a host matches a domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Hosts carrying a non-default port (e.g. "127.0.0.1:8080") match patterns
/// that spell out the same port. Both sides are expected to be lowercase;
/// matching itself is case-sensitive.
///
/// # Examples
///
/// ```
/// use hopper::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(!matches_domain("example.com", "other.com"));
///
/// assert!(matches_domain("*.example.com", "example.com"));
/// assert!(matches_domain("*.example.com", "blog.example.com"));
/// assert!(!matches_domain("*.example.com", "example.org"));
/// ```
pub fn matches_domain(pattern: &str, host: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        // Wildcard pattern: matches the base domain itself or any subdomain
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host == pattern
    }
}
