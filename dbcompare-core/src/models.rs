//! Core data models for comparison setup.
//!
//! These types describe the two endpoints being compared, the outcome of
//! probing and discovering them, the reconciled table mappings and the
//! comparison policy. Values flow one way: configs are consumed by probes,
//! probe results and table lists by reconciliation, and everything by the
//! request assembler.

use crate::error::{DbCompareError, Result};
use crate::security::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "MySQL", alias = "MYSQL")]
    MySql,
    #[serde(alias = "postgres", alias = "PostgreSQL")]
    PostgreSql,
    #[serde(alias = "ORACLE", alias = "Oracle")]
    Oracle,
    #[serde(alias = "mssql", alias = "SqlServer")]
    SqlServer,
}

impl Dialect {
    /// All dialects, in display order.
    pub const ALL: [Dialect; 4] = [
        Dialect::MySql,
        Dialect::PostgreSql,
        Dialect::Oracle,
        Dialect::SqlServer,
    ];

    /// Identifier used on the wire and in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::PostgreSql => "postgresql",
            Dialect::Oracle => "oracle",
            Dialect::SqlServer => "sqlserver",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::MySql => write!(f, "MySQL"),
            Dialect::PostgreSql => write!(f, "PostgreSQL"),
            Dialect::Oracle => write!(f, "Oracle"),
            Dialect::SqlServer => write!(f, "SQL Server"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = DbCompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "postgresql" | "postgres" => Ok(Dialect::PostgreSql),
            "oracle" => Ok(Dialect::Oracle),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            other => Err(DbCompareError::configuration(format!(
                "unsupported database type '{other}'"
            ))),
        }
    }
}

/// Which side of the comparison an endpoint sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Source,
    Target,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRole::Source => write!(f, "source"),
            EndpointRole::Target => write!(f, "target"),
        }
    }
}

/// Bounded network operations issued during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Probe,
    TableListing,
    CatalogQuery,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Probe => write!(f, "Connectivity check"),
            Operation::TableListing => write!(f, "Table listing"),
            Operation::CatalogQuery => write!(f, "Catalog query"),
        }
    }
}

/// Connection parameters for one endpoint.
///
/// `port` stays `None` until either the user sets it or
/// [`EndpointConfig::with_default_port`] fills in the dialect default.
///
/// # Security
/// `Debug` and `Display` never include the secret.
///
/// # Example
/// ```rust
/// use dbcompare_core::models::{Dialect, EndpointConfig};
/// use dbcompare_core::security::Credentials;
///
/// let config = EndpointConfig::new(
///     Dialect::Oracle,
///     "db.example.com",
///     "ORCLPDB1",
///     Credentials::new("scott", "tiger"),
/// )
/// .with_schema_filter("hr")
/// .with_default_port();
///
/// assert_eq!(config.port, Some(1521));
/// assert!(config.validate().is_ok());
/// assert!(!config.to_string().contains("tiger"));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Database dialect
    #[serde(alias = "dbType")]
    pub dialect: Dialect,
    /// Database host address
    pub host: String,
    /// Port, if set by the user or defaulted
    #[serde(default)]
    pub port: Option<u16>,
    /// Database, service or schema identifier
    #[serde(alias = "schema")]
    pub database: String,
    /// Username and secret
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Owner filter for dialects that scope discovery by owner
    #[serde(default, alias = "databaseName")]
    pub schema_filter: Option<String>,
}

impl std::fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}{}/{}",
            self.dialect.as_str(),
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{p}")),
            self.database
        )
        // Intentionally omit username and never include credentials
    }
}

impl EndpointConfig {
    /// Creates an endpoint without a port; see [`Self::with_default_port`].
    pub fn new(
        dialect: Dialect,
        host: impl Into<String>,
        database: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            dialect,
            host: host.into(),
            port: None,
            database: database.into(),
            credentials,
            schema_filter: None,
        }
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set the owner filter.
    pub fn with_schema_filter(mut self, filter: impl Into<String>) -> Self {
        self.schema_filter = Some(filter.into());
        self
    }

    /// Fills in the dialect default port when none was set.
    ///
    /// A port the user already chose is never overwritten, so applying this
    /// any number of times gives the same result.
    pub fn with_default_port(mut self) -> Self {
        if self.port.is_none() {
            self.port = Some(crate::dialect::default_port(self.dialect));
        }
        self
    }

    /// Port to connect to: the user's choice, else the dialect default.
    pub fn resolved_port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| crate::dialect::default_port(self.dialect))
    }

    /// Trimmed, upper-cased owner filter, if one is set and non-empty.
    pub fn normalized_filter(&self) -> Option<String> {
        self.schema_filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_uppercase)
    }

    /// Validates the endpoint before any network call is made.
    ///
    /// # Errors
    /// Returns `Validation` if the host, database or username is empty, the
    /// port is 0, or a mandatory owner filter is missing or malformed.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DbCompareError::validation("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(DbCompareError::validation(
                "port must be between 1 and 65535",
            ));
        }

        if self.database.trim().is_empty() {
            return Err(DbCompareError::validation(
                "database/schema identifier cannot be empty",
            ));
        }

        if self.credentials.username().trim().is_empty() {
            return Err(DbCompareError::validation("username cannot be empty"));
        }

        let policy = crate::dialect::policy(self.dialect);
        if policy.mandatory_filter {
            let Some(filter) = self.normalized_filter() else {
                return Err(DbCompareError::validation(format!(
                    "schema filter is required for {} connections to limit table fetching",
                    self.dialect
                )));
            };
            if !crate::security::is_catalog_identifier(&filter) {
                return Err(DbCompareError::validation(format!(
                    "schema filter '{filter}' is not a valid owner name"
                )));
            }
        }

        Ok(())
    }
}

/// Why a pipeline step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Rejected locally before any network call
    Validation { detail: String },
    /// A bounded operation did not answer in time
    Timeout { operation: Operation, bound: Duration },
    /// The service answered negatively or could not be reached
    Rejected { detail: String },
    /// Both the primary and the fallback discovery attempts failed
    DiscoveryFailed { detail: String },
}

impl FailureReason {
    /// Maps an error into the per-role status taxonomy.
    pub fn from_error(error: &DbCompareError) -> Self {
        match error {
            DbCompareError::Validation { message } | DbCompareError::Configuration { message } => {
                Self::Validation {
                    detail: message.clone(),
                }
            }
            DbCompareError::Timeout {
                operation, bound, ..
            } => Self::Timeout {
                operation: *operation,
                bound: *bound,
            },
            DbCompareError::DiscoveryFailed { context, .. } => Self::DiscoveryFailed {
                detail: context.clone(),
            },
            DbCompareError::ConnectionRejected { detail, .. } => Self::Rejected {
                detail: detail.clone(),
            },
            other => Self::Rejected {
                detail: other.to_string(),
            },
        }
    }

    /// True for timeouts, which get their own, more actionable message.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { detail } => write!(f, "{detail}"),
            Self::Timeout {
                operation: Operation::Probe,
                ..
            } => write!(
                f,
                "Connection timed out. Please check your settings or try again later."
            ),
            Self::Timeout { .. } => write!(
                f,
                "Loading tables timed out. The database might be too large or unreachable."
            ),
            Self::Rejected { detail } => write!(f, "Connection failed: {detail}"),
            Self::DiscoveryFailed { detail } => write!(f, "Failed to load tables: {detail}"),
        }
    }
}

/// Terminal outcome of one probe attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success,
    Failure { reason: FailureReason },
}

/// Result of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    role: EndpointRole,
    outcome: ProbeOutcome,
}

impl ProbeResult {
    /// A successful probe.
    pub fn success(role: EndpointRole) -> Self {
        Self {
            role,
            outcome: ProbeOutcome::Success,
        }
    }

    /// A failed probe.
    pub fn failure(role: EndpointRole, reason: FailureReason) -> Self {
        Self {
            role,
            outcome: ProbeOutcome::Failure { reason },
        }
    }

    /// Role that was probed.
    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Outcome of the probe.
    pub fn outcome(&self) -> &ProbeOutcome {
        &self.outcome
    }

    /// True when the endpoint answered affirmatively in time.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success)
    }

    /// Failure reason, if the probe failed.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match &self.outcome {
            ProbeOutcome::Success => None,
            ProbeOutcome::Failure { reason } => Some(reason),
        }
    }
}

/// Ordered, deduplicated, lower-cased table names for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableList(Vec<String>);

impl TableList {
    /// Normalizes raw names: trims, lower-cases, drops empties and keeps the
    /// first occurrence of each name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tables = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self(tables)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no tables were found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the names in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Names as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a TableList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Value transformation applied to a column before comparing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transformation {
    #[default]
    None,
    Trim,
    Uppercase,
    Lowercase,
    /// Engine-side expression; must be non-empty
    Custom(String),
}

impl Transformation {
    /// Identifier used on the wire (`transformationType`).
    pub fn kind(&self) -> &'static str {
        match self {
            Transformation::None => "none",
            Transformation::Trim => "trim",
            Transformation::Uppercase => "uppercase",
            Transformation::Lowercase => "lowercase",
            Transformation::Custom(_) => "custom",
        }
    }

    /// Custom expression, if any.
    pub fn expression(&self) -> Option<&str> {
        match self {
            Transformation::Custom(expression) => Some(expression),
            _ => None,
        }
    }
}

/// Wire and file form of a column mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnMappingFields {
    source_column: String,
    target_column: String,
    #[serde(default, alias = "iskey")]
    is_key: bool,
    #[serde(default = "default_transformation_type")]
    transformation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_transformation: Option<String>,
}

fn default_transformation_type() -> String {
    "none".to_string()
}

/// Maps one source column to one target column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColumnMappingFields", into = "ColumnMappingFields")]
pub struct ColumnMapping {
    /// Column in the source table
    pub source_column: String,
    /// Column in the target table
    pub target_column: String,
    /// Whether this column is part of the row-matching key
    pub is_key: bool,
    /// Transformation applied before comparing
    pub transformation: Transformation,
}

impl ColumnMapping {
    /// Non-key mapping without transformation.
    pub fn new(source_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            target_column: target_column.into(),
            is_key: false,
            transformation: Transformation::None,
        }
    }

    /// Key mapping without transformation.
    pub fn key(source_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            is_key: true,
            ..Self::new(source_column, target_column)
        }
    }

    /// Builder method to set the transformation.
    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformation = transformation;
        self
    }

    /// Checks that both columns are named and a custom transformation
    /// carries an expression.
    ///
    /// # Errors
    /// Returns `Assembly` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.source_column.trim().is_empty() || self.target_column.trim().is_empty() {
            return Err(DbCompareError::assembly(
                "column mappings must name both a source and a target column",
            ));
        }
        if let Transformation::Custom(expression) = &self.transformation
            && expression.trim().is_empty()
        {
            return Err(DbCompareError::assembly(format!(
                "custom transformation for column '{}' needs an expression",
                self.source_column
            )));
        }
        Ok(())
    }
}

impl TryFrom<ColumnMappingFields> for ColumnMapping {
    type Error = DbCompareError;

    fn try_from(fields: ColumnMappingFields) -> Result<Self> {
        let transformation = match fields.transformation_type.to_lowercase().as_str() {
            "none" | "" => Transformation::None,
            "trim" => Transformation::Trim,
            "uppercase" => Transformation::Uppercase,
            "lowercase" => Transformation::Lowercase,
            "custom" => match fields.custom_transformation {
                Some(expression) if !expression.trim().is_empty() => {
                    Transformation::Custom(expression)
                }
                _ => {
                    return Err(DbCompareError::validation(format!(
                        "custom transformation for column '{}' needs an expression",
                        fields.source_column
                    )));
                }
            },
            other => {
                return Err(DbCompareError::validation(format!(
                    "unknown transformation type '{other}'"
                )));
            }
        };

        Ok(Self {
            source_column: fields.source_column,
            target_column: fields.target_column,
            is_key: fields.is_key,
            transformation,
        })
    }
}

impl From<ColumnMapping> for ColumnMappingFields {
    fn from(mapping: ColumnMapping) -> Self {
        Self {
            transformation_type: mapping.transformation.kind().to_string(),
            custom_transformation: mapping.transformation.expression().map(str::to_string),
            source_column: mapping.source_column,
            target_column: mapping.target_column,
            is_key: mapping.is_key,
        }
    }
}

/// Maps one source table to one target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub source_table: String,
    pub target_table: String,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
}

impl TableMapping {
    /// Table pair without column mappings.
    pub fn new(source_table: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            column_mappings: Vec::new(),
        }
    }

    /// Builder method to add a column mapping.
    pub fn with_column(mut self, column: ColumnMapping) -> Self {
        self.column_mappings.push(column);
        self
    }

    /// Source-side names of the key columns.
    pub fn key_columns(&self) -> Vec<&str> {
        self.column_mappings
            .iter()
            .filter(|c| c.is_key)
            .map(|c| c.source_column.as_str())
            .collect()
    }

    /// True when at least one column is marked as a join key.
    pub fn has_key(&self) -> bool {
        self.column_mappings.iter().any(|c| c.is_key)
    }
}

/// File form of a comparison policy; every field has the tool default.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyFields {
    #[serde(default)]
    case_sensitive: bool,
    #[serde(default = "default_true")]
    ignore_whitespace: bool,
    #[serde(default = "default_true")]
    ignore_nulls: bool,
    #[serde(default = "default_similarity", alias = "stringSimilarityThreshold")]
    similarity_threshold: f64,
    #[serde(default = "default_tolerance")]
    numeric_tolerance: f64,
}

const fn default_true() -> bool {
    true
}

const fn default_similarity() -> f64 {
    0.8
}

const fn default_tolerance() -> f64 {
    0.001
}

/// How values are compared by the engine. Validated at construction.
///
/// # Example
/// ```rust
/// use dbcompare_core::models::ComparisonPolicy;
///
/// let policy = ComparisonPolicy::new(true, true, false, 0.9, 0.0).unwrap();
/// assert!(policy.case_sensitive());
/// assert!(ComparisonPolicy::new(false, true, true, 1.5, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolicyFields", rename_all = "camelCase")]
pub struct ComparisonPolicy {
    case_sensitive: bool,
    ignore_whitespace: bool,
    ignore_nulls: bool,
    similarity_threshold: f64,
    numeric_tolerance: f64,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            ignore_whitespace: true,
            ignore_nulls: true,
            similarity_threshold: default_similarity(),
            numeric_tolerance: default_tolerance(),
        }
    }
}

impl ComparisonPolicy {
    /// Creates a policy.
    ///
    /// # Errors
    /// Returns `Validation` if the similarity threshold is outside [0, 1] or
    /// the numeric tolerance is negative or not finite.
    pub fn new(
        case_sensitive: bool,
        ignore_whitespace: bool,
        ignore_nulls: bool,
        similarity_threshold: f64,
        numeric_tolerance: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(DbCompareError::validation(format!(
                "similarity threshold {similarity_threshold} must be between 0 and 1"
            )));
        }
        if !numeric_tolerance.is_finite() || numeric_tolerance < 0.0 {
            return Err(DbCompareError::validation(format!(
                "numeric tolerance {numeric_tolerance} must be a non-negative number"
            )));
        }
        Ok(Self {
            case_sensitive,
            ignore_whitespace,
            ignore_nulls,
            similarity_threshold,
            numeric_tolerance,
        })
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn ignore_whitespace(&self) -> bool {
        self.ignore_whitespace
    }

    pub fn ignore_nulls(&self) -> bool {
        self.ignore_nulls
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn numeric_tolerance(&self) -> f64 {
        self.numeric_tolerance
    }
}

impl TryFrom<PolicyFields> for ComparisonPolicy {
    type Error = DbCompareError;

    fn try_from(fields: PolicyFields) -> Result<Self> {
        Self::new(
            fields.case_sensitive,
            fields.ignore_whitespace,
            fields.ignore_nulls,
            fields.similarity_threshold,
            fields.numeric_tolerance,
        )
    }
}

/// A complete, validated comparison request.
///
/// Only the request assembler constructs these; there are no mutators.
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    request_id: Uuid,
    assembled_at: DateTime<Utc>,
    source: EndpointConfig,
    target: EndpointConfig,
    policy: ComparisonPolicy,
    mappings: Vec<TableMapping>,
}

impl ComparisonRequest {
    pub(crate) fn new(
        source: EndpointConfig,
        target: EndpointConfig,
        policy: ComparisonPolicy,
        mappings: Vec<TableMapping>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            assembled_at: Utc::now(),
            source,
            target,
            policy,
            mappings,
        }
    }

    /// Unique id of this comparison run.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// When the request was assembled.
    pub fn assembled_at(&self) -> DateTime<Utc> {
        self.assembled_at
    }

    pub fn source(&self) -> &EndpointConfig {
        &self.source
    }

    pub fn target(&self) -> &EndpointConfig {
        &self.target
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }

    pub fn mappings(&self) -> &[TableMapping] {
        &self.mappings
    }
}

/// Handle returned by the comparison engine for a submitted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonTicket {
    #[serde(alias = "id")]
    pub comparison_id: String,
}

/// Engine result for a comparison, kept as the engine sent it.
///
/// Match, mismatch and unmatched counts plus per-record differences are
/// interpreted by whoever renders the report, not by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonOutcome(pub serde_json::Value);

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
