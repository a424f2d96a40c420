//! Filter pipeline
//!
//! Synchronous admission predicates over a candidate request, applied in
//! order with the first failure winning: scheme, depth, allow-list,
//! deny-list. The robots.txt check runs after these, from the worker, since
//! it may need a fetch. Failures are typed, reported once, and never
//! retried.

use crate::request::Request;
use crate::url::matches_domain;
use crate::ErrorKind;

/// Runs the synchronous filters against a request
pub fn check(req: &Request) -> Result<(), ErrorKind> {
    check_scheme(req)?;
    check_depth(req)?;
    check_allowed(req)?;
    check_disallowed(req)
}

fn check_scheme(req: &Request) -> Result<(), ErrorKind> {
    let scheme = req.url().scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ErrorKind::SchemeUnsupported(scheme.to_string()));
    }
    Ok(())
}

fn check_depth(req: &Request) -> Result<(), ErrorKind> {
    if let Some(cap) = req.scope().allowed_depth {
        if req.depth() > cap {
            return Err(ErrorKind::DepthExceeded(req.depth()));
        }
    }
    Ok(())
}

fn check_allowed(req: &Request) -> Result<(), ErrorKind> {
    let allowed = &req.scope().allowed_domains;
    if allowed.is_empty() {
        return Ok(());
    }

    let host = req.host();
    if allowed.iter().any(|pattern| matches_domain(pattern, &host)) {
        Ok(())
    } else {
        Err(ErrorKind::DomainFiltered(host))
    }
}

fn check_disallowed(req: &Request) -> Result<(), ErrorKind> {
    let host = req.host();
    if req
        .scope()
        .disallowed_domains
        .iter()
        .any(|pattern| matches_domain(pattern, &host))
    {
        Err(ErrorKind::DomainFiltered(host))
    } else {
        Ok(())
    }
}
