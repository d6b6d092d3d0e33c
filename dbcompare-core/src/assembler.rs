//! Comparison request assembly.

use crate::error::{DbCompareError, Result};
use crate::models::{
    ComparisonPolicy, ComparisonRequest, EndpointConfig, EndpointRole, ProbeResult, TableMapping,
};
use tracing::info;

/// An endpoint together with the probe that vouched for it.
#[derive(Debug, Clone)]
pub struct ProbedEndpoint {
    pub config: EndpointConfig,
    pub probe: ProbeResult,
}

impl ProbedEndpoint {
    pub fn new(config: EndpointConfig, probe: ProbeResult) -> Self {
        Self { config, probe }
    }

    fn require_success(&self, role: EndpointRole) -> Result<()> {
        if self.probe.role() != role {
            return Err(DbCompareError::assembly(format!(
                "{role} slot holds a probe result for the {} endpoint",
                self.probe.role()
            )));
        }
        if let Some(reason) = self.probe.failure_reason() {
            return Err(DbCompareError::assembly(format!(
                "{role} endpoint has not been verified: {reason}"
            )));
        }
        Ok(())
    }
}

/// Builds a comparison request from two verified endpoints.
///
/// # Errors
/// Returns `Assembly` when either probe did not succeed or belongs to the
/// other role, when `mappings` is empty, when a mapping has no key column,
/// or when a column mapping is incomplete.
pub fn assemble(
    source: ProbedEndpoint,
    target: ProbedEndpoint,
    policy: ComparisonPolicy,
    mappings: Vec<TableMapping>,
) -> Result<ComparisonRequest> {
    source.require_success(EndpointRole::Source)?;
    target.require_success(EndpointRole::Target)?;

    if mappings.is_empty() {
        return Err(DbCompareError::assembly(
            "at least one table mapping is required",
        ));
    }

    for mapping in &mappings {
        if !mapping.has_key() {
            return Err(DbCompareError::assembly(format!(
                "table mapping {} -> {} needs at least one key column",
                mapping.source_table, mapping.target_table
            )));
        }
        for column in &mapping.column_mappings {
            column.validate()?;
        }
    }

    let request = ComparisonRequest::new(source.config, target.config, policy, mappings);
    info!(
        "✓ Assembled comparison request {} with {} table mappings",
        request.request_id(),
        request.mappings().len()
    );
    Ok(request)
}
