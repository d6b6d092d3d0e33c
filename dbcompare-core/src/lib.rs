//! Core library for DBCompare comparison setup.
//!
//! This crate verifies connectivity to a source and a target database
//! through a remote comparison service, discovers the tables each exposes,
//! reconciles them into candidate table mappings and assembles a validated
//! comparison request.
//!
//! # Security Guarantees
//! - Endpoint secrets live in zeroizing containers and never reach logs,
//!   `Debug` or `Display` output
//! - Owner filters are validated before they are embedded in catalog SQL
//! - Submission documents are schema-checked before any network call
//!
//! # Architecture
//! - `dialect`: per-dialect ports, filters and discovery strategy
//! - `probe` and `discovery`: bounded per-endpoint operations
//! - `reconcile` and `assembler`: pure request construction
//! - `orchestrator`: concurrent source/target pipelines with generations
//! - `service`: the comparison service boundary and its HTTP client

pub mod assembler;
pub mod config;
pub mod dialect;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod probe;
pub mod reconcile;
pub mod security;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use assembler::{ProbedEndpoint, assemble};
pub use config::ServiceConfig;
pub use dialect::{DialectPolicy, DiscoveryStrategy};
pub use discovery::discover;
pub use error::{DbCompareError, Result};
pub use models::{
    ColumnMapping, ComparisonOutcome, ComparisonPolicy, ComparisonRequest, ComparisonTicket,
    Dialect, EndpointConfig, EndpointRole, FailureReason, Operation, ProbeOutcome, ProbeResult,
    TableList, TableMapping, Transformation,
};
pub use orchestrator::{EndpointPair, PipelineOutcome, PipelineState, SetupContext, SetupReport};
pub use probe::probe;
pub use reconcile::{Reconciliation, reconcile, reconcile_report};
pub use security::Credentials;
pub use service::{ComparisonService, DiscoveryResponse, HttpComparisonService};
pub use validation::{ValidationError, initialize_schema_validator, validate_submission_payload};
