//! Setup orchestration for a source/target pair.
//!
//! A [`SetupContext`] owns the service handle and one state machine per
//! endpoint role. Each pipeline run takes a new generation number; a run
//! whose generation has been superseded by a newer run for the same role
//! finishes without touching the role's state.
//!
//! ```text
//! Idle ──> Probing ──> Discovering ──> Ready(tables)
//!             │             │
//!             └─────────────┴────────> Failed(reason)
//! ```

use crate::assembler::ProbedEndpoint;
use crate::config::ServiceConfig;
use crate::discovery::discover;
use crate::error::{DbCompareError, Result};
use crate::models::{
    ComparisonOutcome, ComparisonRequest, ComparisonTicket, EndpointConfig, EndpointRole,
    FailureReason, ProbeResult, TableList,
};
use crate::probe::probe;
use crate::reconcile::{Reconciliation, reconcile_report};
use crate::service::{ComparisonService, submission_document};
use crate::validation::validate_submission_payload;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Observable state of one role's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Probing,
    Discovering,
    Ready(TableList),
    Failed(FailureReason),
}

/// What a single pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Probe succeeded and tables were discovered
    Ready {
        probe: ProbeResult,
        tables: TableList,
    },
    /// The run ended in a failure; `probe` is absent when validation
    /// rejected the endpoint before probing
    Failed {
        probe: Option<ProbeResult>,
        reason: FailureReason,
    },
    /// A newer run for the same role started; this result was discarded
    Superseded,
}

impl PipelineOutcome {
    /// Discovered tables, if the run is ready.
    pub fn tables(&self) -> Option<&TableList> {
        match self {
            Self::Ready { tables, .. } => Some(tables),
            _ => None,
        }
    }

    /// Probe result, if a probe completed in this run.
    pub fn probe(&self) -> Option<&ProbeResult> {
        match self {
            Self::Ready { probe, .. } => Some(probe),
            Self::Failed { probe, .. } => probe.as_ref(),
            Self::Superseded => None,
        }
    }

    /// Whether the endpoint answered affirmatively, regardless of discovery.
    pub fn probe_succeeded(&self) -> bool {
        self.probe().is_some_and(ProbeResult::is_success)
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// The last pair of endpoints that both probed successfully.
///
/// Display only: reuse requires probing again.
#[derive(Debug, Clone)]
pub struct EndpointPair {
    pub source: EndpointConfig,
    pub target: EndpointConfig,
}

/// Joint result of preparing both endpoints.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub source: PipelineOutcome,
    pub target: PipelineOutcome,
    pub reconciliation: Reconciliation,
    endpoints: EndpointPair,
}

impl SetupReport {
    /// Outcome for one role.
    pub fn outcome(&self, role: EndpointRole) -> &PipelineOutcome {
        match role {
            EndpointRole::Source => &self.source,
            EndpointRole::Target => &self.target,
        }
    }

    /// Endpoints as they were prepared, with default ports applied.
    pub fn endpoints(&self) -> &EndpointPair {
        &self.endpoints
    }

    /// True when both roles are ready with non-empty table lists and at
    /// least one table is common to both.
    pub fn can_proceed(&self) -> bool {
        let has_tables = |outcome: &PipelineOutcome| outcome.tables().is_some_and(|t| !t.is_empty());
        has_tables(&self.source) && has_tables(&self.target) && !self.reconciliation.is_empty()
    }

    /// Pairs each endpoint with its successful probe, ready for assembly.
    ///
    /// # Errors
    /// Returns `ReconciliationEmpty` when both sides are ready but share no
    /// tables, and `Assembly` when either side is not ready.
    pub fn verified_endpoints(&self) -> Result<(ProbedEndpoint, ProbedEndpoint)> {
        let verified = |role: EndpointRole, config: &EndpointConfig| match self.outcome(role) {
            PipelineOutcome::Ready { probe, .. } => {
                Ok(ProbedEndpoint::new(config.clone(), probe.clone()))
            }
            PipelineOutcome::Failed { reason, .. } => Err(DbCompareError::assembly(format!(
                "{role} endpoint is not ready: {reason}"
            ))),
            PipelineOutcome::Superseded => Err(DbCompareError::assembly(format!(
                "{role} endpoint was re-checked while this setup was running"
            ))),
        };

        let source = verified(EndpointRole::Source, &self.endpoints.source)?;
        let target = verified(EndpointRole::Target, &self.endpoints.target)?;
        if self.reconciliation.is_empty() {
            return Err(DbCompareError::ReconciliationEmpty);
        }
        Ok((source, target))
    }
}

#[derive(Debug, Default)]
struct RoleSlot {
    generation: u64,
    state: PipelineState,
}

/// Per-role state machine guarded by a generation counter.
#[derive(Debug, Default)]
struct RoleTracker {
    slot: Mutex<RoleSlot>,
}

impl RoleTracker {
    /// Starts a new generation and moves to `Probing`.
    fn begin(&self) -> u64 {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.state = PipelineState::Probing;
        slot.generation
    }

    /// Applies `state` if `generation` is still current.
    fn transition(&self, generation: u64, state: PipelineState) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation {
            return false;
        }
        slot.state = state;
        true
    }

    fn state(&self) -> PipelineState {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    fn generation(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }
}

/// Explicit context for one comparison setup session.
///
/// # Example
/// ```rust,no_run
/// use dbcompare_core::config::ServiceConfig;
/// use dbcompare_core::orchestrator::SetupContext;
/// use dbcompare_core::service::HttpComparisonService;
/// use std::sync::Arc;
///
/// # fn example() -> dbcompare_core::Result<()> {
/// let settings = ServiceConfig::default();
/// let service = Arc::new(HttpComparisonService::new(&settings)?);
/// let context = SetupContext::new(service, settings);
/// assert!(context.last_known_good().is_none());
/// # Ok(())
/// # }
/// ```
pub struct SetupContext {
    service: Arc<dyn ComparisonService>,
    settings: ServiceConfig,
    source: RoleTracker,
    target: RoleTracker,
    last_known_good: RwLock<Option<Arc<EndpointPair>>>,
}

impl std::fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupContext")
            .field("settings", &self.settings)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl SetupContext {
    pub fn new(service: Arc<dyn ComparisonService>, settings: ServiceConfig) -> Self {
        Self {
            service,
            settings,
            source: RoleTracker::default(),
            target: RoleTracker::default(),
            last_known_good: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &ServiceConfig {
        &self.settings
    }

    fn tracker(&self, role: EndpointRole) -> &RoleTracker {
        match role {
            EndpointRole::Source => &self.source,
            EndpointRole::Target => &self.target,
        }
    }

    /// Current state of a role's pipeline.
    pub fn state(&self, role: EndpointRole) -> PipelineState {
        self.tracker(role).state()
    }

    /// Number of pipeline runs started for a role.
    pub fn generation(&self, role: EndpointRole) -> u64 {
        self.tracker(role).generation()
    }

    /// Last pair of endpoints that both probed successfully.
    pub fn last_known_good(&self) -> Option<Arc<EndpointPair>> {
        self.last_known_good
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Probes one endpoint and, if reachable, discovers its tables.
    ///
    /// Starting a run supersedes any earlier run for the same role; the
    /// earlier run keeps going but its result is reported as
    /// [`PipelineOutcome::Superseded`] and never reaches the role's state.
    pub async fn run_pipeline(&self, role: EndpointRole, config: &EndpointConfig) -> PipelineOutcome {
        let tracker = self.tracker(role);
        let generation = tracker.begin();
        debug!("Starting {} pipeline generation {}", role, generation);

        let settle = |state: PipelineState, outcome: PipelineOutcome| {
            if tracker.transition(generation, state) {
                outcome
            } else {
                debug!("Discarding superseded {} pipeline generation {}", role, generation);
                PipelineOutcome::Superseded
            }
        };

        let probe_result = match probe(
            self.service.as_ref(),
            role,
            config,
            self.settings.probe_timeout,
        )
        .await
        {
            Ok(result) => result,
            Err(error) => {
                let reason = FailureReason::from_error(&error);
                warn!("{} endpoint rejected before probing: {}", role, error);
                return settle(
                    PipelineState::Failed(reason.clone()),
                    PipelineOutcome::Failed {
                        probe: None,
                        reason,
                    },
                );
            }
        };

        if let Some(reason) = probe_result.failure_reason().cloned() {
            return settle(
                PipelineState::Failed(reason.clone()),
                PipelineOutcome::Failed {
                    probe: Some(probe_result),
                    reason,
                },
            );
        }

        if !tracker.transition(generation, PipelineState::Discovering) {
            debug!("Discarding superseded {} pipeline generation {}", role, generation);
            return PipelineOutcome::Superseded;
        }

        match discover(
            self.service.as_ref(),
            role,
            config,
            self.settings.discovery_timeout,
        )
        .await
        {
            Ok(tables) => settle(
                PipelineState::Ready(tables.clone()),
                PipelineOutcome::Ready {
                    probe: probe_result,
                    tables,
                },
            ),
            Err(error) => {
                warn!("{} table discovery failed: {}", role, error);
                let reason = FailureReason::from_error(&error);
                settle(
                    PipelineState::Failed(reason.clone()),
                    PipelineOutcome::Failed {
                        probe: Some(probe_result),
                        reason,
                    },
                )
            }
        }
    }

    /// Runs both pipelines concurrently and reconciles their tables.
    ///
    /// Default ports are applied to both endpoints first. When both probes
    /// succeed the pair becomes the new last-known-good pair, even if
    /// discovery later failed for one side.
    pub async fn prepare(&self, source: EndpointConfig, target: EndpointConfig) -> SetupReport {
        let source = source.with_default_port();
        let target = target.with_default_port();

        let (source_outcome, target_outcome) = futures::future::join(
            self.run_pipeline(EndpointRole::Source, &source),
            self.run_pipeline(EndpointRole::Target, &target),
        )
        .await;

        let reconciliation = match (source_outcome.tables(), target_outcome.tables()) {
            (Some(source_tables), Some(target_tables)) => {
                let report = reconcile_report(source_tables, target_tables);
                if report.is_empty() {
                    warn!("{}", DbCompareError::ReconciliationEmpty);
                } else {
                    info!("✓ {} tables common to source and target", report.mappings.len());
                }
                report
            }
            _ => Reconciliation::default(),
        };

        let endpoints = EndpointPair { source, target };
        if source_outcome.probe_succeeded() && target_outcome.probe_succeeded() {
            let mut slot = self
                .last_known_good
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = Some(Arc::new(endpoints.clone()));
        }

        SetupReport {
            source: source_outcome,
            target: target_outcome,
            reconciliation,
            endpoints,
        }
    }

    /// Validates and submits an assembled request.
    ///
    /// # Errors
    /// Returns `Assembly` if the submission document fails schema
    /// validation (nothing is sent), or the service's error otherwise.
    pub async fn submit(&self, request: &ComparisonRequest) -> Result<ComparisonTicket> {
        let document = submission_document(request)?;
        validate_submission_payload(&document).map_err(|e| {
            DbCompareError::assembly(format!("submission document is invalid: {e}"))
        })?;

        let ticket = self.service.submit_comparison(request).await?;
        info!(
            "✓ Submitted comparison {} as {}",
            request.request_id(),
            ticket.comparison_id
        );
        Ok(ticket)
    }

    /// Retrieves the engine's result for a submitted comparison.
    ///
    /// # Errors
    /// Returns the service's error if the result cannot be fetched.
    pub async fn fetch_outcome(&self, ticket: &ComparisonTicket) -> Result<ComparisonOutcome> {
        self.service.fetch_outcome(ticket).await
    }
}
