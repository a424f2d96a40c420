//! HTML parsing and link extraction
//!
//! Walks the parsed document over `a[href]`, skipping anchors whose `rel`
//! carries the `nofollow` token, and resolves every remaining href against
//! the fetched page. Candidates come back canonical (absolute, fragment
//! stripped, http(s) only); admission and dedup stay with the scheduler.

use scraper::{Html, Selector};
use url::Url;

use crate::url::canonicalize;

/// Parses an HTML body into a traversable document
///
/// HTML5 parsing is lenient; malformed markup yields a best-effort tree
/// rather than an error.
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

/// Extracts canonical link candidates from a parsed page
///
/// # Arguments
///
/// * `doc` - The parsed document
/// * `base` - The absolute URL the page was fetched from
///
/// # Returns
///
/// Resolved absolute URLs in document order; hrefs that cannot be
/// canonicalized (unparseable, `javascript:`, `mailto:`, …) are dropped.
pub fn extract_links(doc: &Html, base: &Url) -> Vec<Url> {
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();
    for element in doc.select(&selector) {
        if let Some(rel) = element.value().attr("rel") {
            if rel
                .split_whitespace()
                .any(|token| token.eq_ignore_ascii_case("nofollow"))
            {
                continue;
            }
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        if let Ok(url) = canonicalize(href, Some(base)) {
            links.push(url);
        }
    }

    links
}
