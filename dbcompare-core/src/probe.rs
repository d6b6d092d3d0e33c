//! Bounded connectivity checks.

use crate::dialect;
use crate::error::{DbCompareError, Result};
use crate::models::{EndpointConfig, EndpointRole, FailureReason, Operation, ProbeResult};
use crate::service::ComparisonService;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Checks that the service can reach one endpoint within `bound`.
///
/// The endpoint is validated first; a validation failure is returned as
/// `Err` and no request is sent. Every outcome after that is reported as a
/// [`ProbeResult`]: an affirmative answer is a success, no answer within the
/// bound is a timeout, and a negative answer or transport failure is a
/// rejection.
///
/// # Errors
/// Returns `Validation` if the endpoint is incomplete.
pub async fn probe(
    service: &dyn ComparisonService,
    role: EndpointRole,
    config: &EndpointConfig,
    bound: Duration,
) -> Result<ProbeResult> {
    config.validate()?;

    if let Some(advice) = dialect::port_advisory(config.dialect, config.resolved_port()) {
        warn!("{} endpoint: {}", role, advice);
    }

    debug!("Probing {} endpoint {}", role, config);

    let result = match tokio::time::timeout(bound, service.check_connection(role, config)).await
    {
        Ok(Ok(true)) => {
            info!("✓ {} endpoint reachable", role);
            ProbeResult::success(role)
        }
        Ok(Ok(false)) => {
            warn!("{} endpoint refused the connection", role);
            ProbeResult::failure(
                role,
                FailureReason::Rejected {
                    detail: "host or credentials were rejected".to_string(),
                },
            )
        }
        Ok(Err(error)) => {
            warn!("{} endpoint probe failed: {}", role, error);
            ProbeResult::failure(role, rejection_reason(&error))
        }
        Err(_) => {
            warn!(
                "{} endpoint did not answer within {}s",
                role,
                bound.as_secs()
            );
            ProbeResult::failure(
                role,
                FailureReason::Timeout {
                    operation: Operation::Probe,
                    bound,
                },
            )
        }
    };

    Ok(result)
}

fn rejection_reason(error: &DbCompareError) -> FailureReason {
    match error {
        DbCompareError::ConnectionRejected { detail, .. } => FailureReason::Rejected {
            detail: detail.clone(),
        },
        DbCompareError::Timeout {
            operation, bound, ..
        } => FailureReason::Timeout {
            operation: *operation,
            bound: *bound,
        },
        other => FailureReason::Rejected {
            detail: other.to_string(),
        },
    }
}
