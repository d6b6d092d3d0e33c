//! Per-dialect connection and discovery rules.
//!
//! Each supported dialect has one [`DialectPolicy`] record. Adding a dialect
//! means adding a record here; probe and discovery code only ever consult
//! the table.

use crate::models::Dialect;

/// How tables are discovered for a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// Ask the service for the table list directly
    Listing,
    /// Run an owner-scoped catalog query, then one fallback query on failure
    FilteredQueryWithFallback,
}

/// Static rules for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectPolicy {
    pub dialect: Dialect,
    pub default_port: u16,
    pub mandatory_filter: bool,
    pub strategy: DiscoveryStrategy,
    /// Primary catalog query; `{filter}` is replaced by the owner name
    pub primary_query: Option<&'static str>,
    /// Query against the current principal's own tables
    pub fallback_query: Option<&'static str>,
}

const FILTER_PLACEHOLDER: &str = "{filter}";

static POLICIES: [DialectPolicy; 4] = [
    DialectPolicy {
        dialect: Dialect::MySql,
        default_port: 3306,
        mandatory_filter: false,
        strategy: DiscoveryStrategy::Listing,
        primary_query: None,
        fallback_query: None,
    },
    DialectPolicy {
        dialect: Dialect::PostgreSql,
        default_port: 5432,
        mandatory_filter: false,
        strategy: DiscoveryStrategy::Listing,
        primary_query: None,
        fallback_query: None,
    },
    DialectPolicy {
        dialect: Dialect::Oracle,
        default_port: 1521,
        mandatory_filter: true,
        strategy: DiscoveryStrategy::FilteredQueryWithFallback,
        primary_query: Some(
            "SELECT table_name FROM all_tables WHERE owner = '{filter}' ORDER BY table_name",
        ),
        fallback_query: Some("SELECT table_name FROM user_tables ORDER BY table_name"),
    },
    DialectPolicy {
        dialect: Dialect::SqlServer,
        default_port: 1433,
        mandatory_filter: false,
        strategy: DiscoveryStrategy::Listing,
        primary_query: None,
        fallback_query: None,
    },
];

/// Returns the policy record for a dialect.
pub fn policy(dialect: Dialect) -> &'static DialectPolicy {
    match dialect {
        Dialect::MySql => &POLICIES[0],
        Dialect::PostgreSql => &POLICIES[1],
        Dialect::Oracle => &POLICIES[2],
        Dialect::SqlServer => &POLICIES[3],
    }
}

/// All policy records, in display order.
pub fn policies() -> &'static [DialectPolicy] {
    &POLICIES
}

/// Conventional listener port for a dialect.
pub fn default_port(dialect: Dialect) -> u16 {
    policy(dialect).default_port
}

/// Whether discovery must be scoped by an owner filter.
pub fn requires_mandatory_filter(dialect: Dialect) -> bool {
    policy(dialect).mandatory_filter
}

pub fn discovery_strategy(dialect: Dialect) -> DiscoveryStrategy {
    policy(dialect).strategy
}

/// Builds the primary catalog query for an already-normalized owner name.
///
/// Returns `None` for dialects that discover by listing. Callers must pass a
/// value accepted by [`crate::security::is_catalog_identifier`].
pub fn primary_catalog_query(dialect: Dialect, filter: &str) -> Option<String> {
    policy(dialect)
        .primary_query
        .map(|template| template.replace(FILTER_PLACEHOLDER, filter))
}

pub fn fallback_catalog_query(dialect: Dialect) -> Option<&'static str> {
    policy(dialect).fallback_query
}

/// Advisory message when a port differs from the conventional one.
///
/// Only dialects with a fixed listener convention produce advice; the
/// connection attempt still proceeds.
pub fn port_advisory(dialect: Dialect, port: u16) -> Option<String> {
    let expected = default_port(dialect);
    (dialect == Dialect::Oracle && port != expected).then(|| {
        format!("{dialect} usually listens on port {expected}; {port} is configured")
    })
}
