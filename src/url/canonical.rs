use url::Url;

use crate::ErrorKind;

/// Canonicalizes a raw URL reference into the form used for admission
///
/// # Canonicalization Steps
///
/// 1. Resolve `raw` against `base` when one is given (link discovery);
///    otherwise `raw` must be absolute (seeds)
/// 2. Require scheme `http` or `https`
/// 3. Clear the fragment
///
/// Host lowercasing and percent-encoding normalization are performed by the
/// `url` crate during parsing. Path and query are kept as-is: two URLs that
/// differ only in query string are distinct pages.
///
/// The string form of the returned URL is the seen-set key.
///
/// # Arguments
///
/// * `raw` - The URL reference, absolute or relative
/// * `base` - The page the reference was found on, if any
///
/// # Returns
///
/// * `Ok(Url)` - Canonical absolute URL
/// * `Err(ErrorKind)` - `InvalidUrl` or `SchemeUnsupported`
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<Url, ErrorKind> {
    let mut url = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| ErrorKind::InvalidUrl(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ErrorKind::SchemeUnsupported(url.scheme().to_string()));
    }

    url.set_fragment(None);

    Ok(url)
}
