//! Security utilities for credential protection.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Secrets never appear in `Debug` or `Display` output
//! - Catalog identifiers that end up inside SQL text are validated first

mod credentials;

pub use credentials::Credentials;

use regex::Regex;
use std::sync::OnceLock;

/// Pattern for identifiers that may be interpolated into catalog queries.
///
/// Letters, digits, `_`, `$` and `#`, starting with a letter. This accepts
/// common-user prefixes such as `C##APP` and rejects quotes, whitespace and
/// anything else that could change the shape of the query.
fn catalog_identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_$#]{0,127}$").ok())
        .as_ref()
}

/// Checks whether a value is safe to embed in a catalog query literal.
pub fn is_catalog_identifier(value: &str) -> bool {
    catalog_identifier_pattern().is_some_and(|pattern| pattern.is_match(value))
}
