//! Table discovery for a reachable endpoint.
//!
//! Dialects either list tables through the service or run an owner-scoped
//! catalog query with a single fallback. Both paths end in a normalized
//! [`TableList`].

use crate::dialect::{self, DiscoveryStrategy};
use crate::error::{DbCompareError, Result};
use crate::models::{EndpointConfig, EndpointRole, Operation, TableList};
use crate::service::{CatalogRow, ComparisonService};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Column keys that may carry the table name, in lookup order.
pub const TABLE_NAME_KEYS: [&str; 5] = [
    "TABLE_NAME",
    "table_name",
    "TABLENAME",
    "tableName",
    "tablename",
];

/// Discovers the tables visible at `config`.
///
/// Must only be called after a successful probe for the same endpoint. Each
/// request is bounded by `bound` on its own.
///
/// # Errors
/// - `Validation` if the endpoint is incomplete
/// - `Timeout` if a listing request does not answer in time
/// - `DiscoveryFailed` if listing fails, or if both the primary and the
///   fallback catalog queries fail
pub async fn discover(
    service: &dyn ComparisonService,
    role: EndpointRole,
    config: &EndpointConfig,
    bound: Duration,
) -> Result<TableList> {
    config.validate()?;

    let tables = match dialect::discovery_strategy(config.dialect) {
        DiscoveryStrategy::Listing => list_tables(service, role, config, bound).await?,
        DiscoveryStrategy::FilteredQueryWithFallback => {
            query_with_fallback(service, role, config, bound).await?
        }
    };

    info!("✓ Found {} tables on {} endpoint", tables.len(), role);
    Ok(tables)
}

async fn list_tables(
    service: &dyn ComparisonService,
    role: EndpointRole,
    config: &EndpointConfig,
    bound: Duration,
) -> Result<TableList> {
    debug!("Listing tables for {} endpoint", role);

    let response = tokio::time::timeout(bound, service.list_tables(role, config))
        .await
        .map_err(|_| DbCompareError::Timeout {
            role,
            operation: Operation::TableListing,
            bound,
        })?
        .map_err(|error| match error {
            DbCompareError::Timeout { .. } => error,
            other => DbCompareError::discovery_failed(role, other.to_string()),
        })?;

    Ok(TableList::from_names(response.names_for(role)))
}

async fn query_with_fallback(
    service: &dyn ComparisonService,
    role: EndpointRole,
    config: &EndpointConfig,
    bound: Duration,
) -> Result<TableList> {
    let filter = config.normalized_filter().ok_or_else(|| {
        DbCompareError::validation(format!(
            "schema filter is required for {} table discovery",
            config.dialect
        ))
    })?;

    let primary_error = match dialect::primary_catalog_query(config.dialect, &filter) {
        Some(query) => match run_query(service, role, config, &query, bound).await {
            Ok(rows) => return Ok(tables_from_rows(&rows)),
            Err(error) => error,
        },
        None => DbCompareError::configuration(format!(
            "{} has no catalog query configured",
            config.dialect
        )),
    };

    warn!(
        "Primary table query for {} endpoint failed ({}); trying current-user tables",
        role, primary_error
    );

    let Some(fallback) = dialect::fallback_catalog_query(config.dialect) else {
        return Err(DbCompareError::discovery_failed(
            role,
            primary_error.to_string(),
        ));
    };

    match run_query(service, role, config, fallback, bound).await {
        Ok(rows) => Ok(tables_from_rows(&rows)),
        Err(fallback_error) => Err(DbCompareError::discovery_failed(
            role,
            format!("primary query: {primary_error}; fallback query: {fallback_error}"),
        )),
    }
}

async fn run_query(
    service: &dyn ComparisonService,
    role: EndpointRole,
    config: &EndpointConfig,
    query: &str,
    bound: Duration,
) -> Result<Vec<CatalogRow>> {
    tokio::time::timeout(bound, service.run_catalog_query(role, config, query))
        .await
        .map_err(|_| DbCompareError::Timeout {
            role,
            operation: Operation::CatalogQuery,
            bound,
        })?
}

fn tables_from_rows(rows: &[CatalogRow]) -> TableList {
    TableList::from_names(rows.iter().filter_map(extract_table_name))
}

/// Pulls the table name out of one catalog row.
///
/// Known keys are tried in [`TABLE_NAME_KEYS`] order, then the first column.
/// Null, empty and non-string values yield `None`.
pub fn extract_table_name(row: &CatalogRow) -> Option<&str> {
    let value = TABLE_NAME_KEYS
        .iter()
        .find_map(|key| row.get(*key))
        .or_else(|| row.values().next())?;

    match value {
        Value::String(name) if !name.trim().is_empty() => Some(name.as_str()),
        _ => None,
    }
}
