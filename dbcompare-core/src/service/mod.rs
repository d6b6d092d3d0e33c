//! Comparison service boundary.
//!
//! The comparison service is the remote collaborator that owns database
//! drivers and the comparison engine. Everything in this crate talks to it
//! through the [`ComparisonService`] trait so that probes, discovery and the
//! orchestrator can be exercised against an in-memory implementation.
//!
//! # Module Structure
//! - `wire`: JSON payloads and the normalized discovery response
//! - `http`: `reqwest`-backed implementation

use crate::Result;
use crate::models::{
    ComparisonOutcome, ComparisonRequest, ComparisonTicket, EndpointConfig, EndpointRole,
};
use async_trait::async_trait;

pub mod http;
pub mod wire;

pub use http::HttpComparisonService;
pub use wire::{CatalogRow, DiscoveryResponse, submission_document};

/// Operations the comparison service exposes to setup.
///
/// Implementations do not apply their own deadlines beyond transport
/// defaults; callers wrap every call in a bounded timeout.
///
/// # Object Safety
/// This trait is object-safe and is shared as `Arc<dyn ComparisonService>`.
#[async_trait]
pub trait ComparisonService: Send + Sync {
    /// Asks the service whether it can connect to the endpoint.
    ///
    /// `Ok(false)` is a negative answer; `Err` means the service itself
    /// could not be reached or failed.
    async fn check_connection(&self, role: EndpointRole, config: &EndpointConfig)
    -> Result<bool>;

    /// Requests the endpoint's table list.
    async fn list_tables(
        &self,
        role: EndpointRole,
        config: &EndpointConfig,
    ) -> Result<DiscoveryResponse>;

    /// Runs a read-only catalog query and returns its rows.
    async fn run_catalog_query(
        &self,
        role: EndpointRole,
        config: &EndpointConfig,
        query: &str,
    ) -> Result<Vec<CatalogRow>>;

    /// Submits a validated comparison request.
    async fn submit_comparison(&self, request: &ComparisonRequest) -> Result<ComparisonTicket>;

    /// Retrieves the engine's result for a submitted comparison.
    async fn fetch_outcome(&self, ticket: &ComparisonTicket) -> Result<ComparisonOutcome>;
}
