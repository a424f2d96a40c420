//! URL handling module for hopper
//!
//! Canonicalization, host extraction, and domain-pattern matching. The
//! canonical string form produced here is the admission key: absolute,
//! fragment-stripped, lowercase host, scheme restricted to http(s).

mod canonical;
mod domain;
mod matcher;

pub use canonical::canonicalize;
pub use domain::host_of;
pub use matcher::matches_domain;
