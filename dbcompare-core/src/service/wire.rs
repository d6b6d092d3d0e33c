//! JSON shapes exchanged with the comparison service.
//!
//! Outgoing payloads are typed structs serialized with `serde`. Incoming
//! table listings arrive in several shapes; they are normalized into
//! [`DiscoveryResponse`] once, here, so nothing downstream inspects raw JSON.

use crate::error::{DbCompareError, Result};
use crate::models::{ColumnMapping, ComparisonRequest, EndpointConfig, EndpointRole};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version tag carried by every submission document
pub const SUBMISSION_FORMAT_VERSION: &str = "1.0";

/// Separator used by services that answer with `"source -> target"` pairs
const PAIR_SEPARATOR: &str = "->";

/// One row returned by a catalog query, keyed by column name
pub type CatalogRow = Map<String, Value>;

/// Connection fields of one endpoint as the service expects them.
///
/// Not `Debug`: this struct holds the plain secret.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPayload<'a> {
    db_type: &'static str,
    host: &'a str,
    port: u16,
    schema: &'a str,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_filter: Option<String>,
}

impl<'a> EndpointPayload<'a> {
    pub fn new(config: &'a EndpointConfig) -> Self {
        Self {
            db_type: config.dialect.as_str(),
            host: config.host.trim(),
            port: config.resolved_port(),
            schema: config.database.trim(),
            username: config.credentials.username(),
            password: config.credentials.secret(),
            schema_filter: config.normalized_filter(),
        }
    }
}

/// Body of probe, listing and catalog-query requests
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRequest<'a> {
    role: EndpointRole,
    row_limit: u32,
    #[serde(flatten)]
    endpoint: EndpointPayload<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
}

impl<'a> EndpointRequest<'a> {
    pub fn new(role: EndpointRole, config: &'a EndpointConfig, row_limit: u32) -> Self {
        Self {
            role,
            row_limit,
            endpoint: EndpointPayload::new(config),
            query: None,
        }
    }

    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }
}

/// Answer to a connectivity check: a bare flag or a status object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProbeReply {
    Flag(bool),
    Status {
        #[serde(alias = "connected", alias = "ok")]
        success: bool,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ProbeReply {
    pub fn is_affirmative(&self) -> bool {
        match self {
            ProbeReply::Flag(flag) => *flag,
            ProbeReply::Status { success, .. } => *success,
        }
    }
}

/// Rows of a catalog query: a bare array or wrapped in `rows`/`data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CatalogReply {
    Rows(Vec<CatalogRow>),
    Wrapped {
        #[serde(alias = "data", alias = "results")]
        rows: Vec<CatalogRow>,
    },
}

impl CatalogReply {
    pub fn into_rows(self) -> Vec<CatalogRow> {
        match self {
            CatalogReply::Rows(rows) | CatalogReply::Wrapped { rows } => rows,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairDescriptor {
    #[serde(alias = "source")]
    source_table: String,
    #[serde(alias = "target")]
    target_table: String,
}

#[derive(Debug, Deserialize)]
struct TableDescriptor {
    #[serde(default, alias = "tableName", alias = "table_name", alias = "TABLE_NAME")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Name(String),
    Pair(PairDescriptor),
    Table(TableDescriptor),
    Null,
}

impl RawEntry {
    /// Null entries and descriptors without a usable name
    fn is_blank(&self) -> bool {
        match self {
            RawEntry::Name(name) => name.trim().is_empty(),
            RawEntry::Pair(_) => false,
            RawEntry::Table(table) => table.name.as_deref().is_none_or(|n| n.trim().is_empty()),
            RawEntry::Null => true,
        }
    }

    fn as_pair(&self) -> Option<(String, String)> {
        match self {
            RawEntry::Name(name) => name
                .split_once(PAIR_SEPARATOR)
                .map(|(source, target)| (source.trim().to_string(), target.trim().to_string())),
            RawEntry::Pair(pair) => Some((pair.source_table.clone(), pair.target_table.clone())),
            RawEntry::Table(_) | RawEntry::Null => None,
        }
    }

    fn into_name(self) -> Option<String> {
        match self {
            RawEntry::Name(name) => Some(name),
            RawEntry::Pair(pair) => Some(pair.source_table),
            RawEntry::Table(table) => table.name,
            RawEntry::Null => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDiscovery {
    Entries(Vec<RawEntry>),
    Wrapped {
        #[serde(alias = "tableNames", alias = "data")]
        tables: Vec<RawEntry>,
    },
}

/// Table listing as returned by the service, classified once.
///
/// Some deployments answer with `"source -> target"` pairs, others with a
/// flat list of names or table descriptors. A listing is paired only when
/// every entry is a pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDiscovery")]
pub enum DiscoveryResponse {
    PairedList(Vec<(String, String)>),
    FlatList(Vec<String>),
}

impl From<RawDiscovery> for DiscoveryResponse {
    fn from(raw: RawDiscovery) -> Self {
        let entries: Vec<RawEntry> = match raw {
            RawDiscovery::Entries(entries) | RawDiscovery::Wrapped { tables: entries } => entries,
        }
        .into_iter()
        .filter(|entry| !entry.is_blank())
        .collect();

        if !entries.is_empty() {
            let pairs: Option<Vec<_>> = entries.iter().map(RawEntry::as_pair).collect();
            if let Some(pairs) = pairs {
                return Self::PairedList(pairs);
            }
        }

        Self::FlatList(entries.into_iter().filter_map(RawEntry::into_name).collect())
    }
}

impl DiscoveryResponse {
    /// Names visible to `role`: the matching side of each pair, or the flat
    /// list unchanged.
    pub fn names_for(&self, role: EndpointRole) -> Vec<&str> {
        match self {
            Self::PairedList(pairs) => pairs
                .iter()
                .map(|(source, target)| match role {
                    EndpointRole::Source => source.as_str(),
                    EndpointRole::Target => target.as_str(),
                })
                .collect(),
            Self::FlatList(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MappingPayload<'a> {
    source_table: &'a str,
    target_table: &'a str,
    key_columns: Vec<&'a str>,
    column_mappings: &'a [ColumnMapping],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyPayload<'a> {
    case_sensitive: bool,
    ignore_whitespace: bool,
    ignore_nulls: bool,
    string_similarity_threshold: f64,
    numeric_tolerance: f64,
    table_mappings: Vec<MappingPayload<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionPayload<'a> {
    format_version: &'static str,
    request_id: String,
    assembled_at: String,
    source_config: EndpointPayload<'a>,
    target_config: EndpointPayload<'a>,
    comparison_config: PolicyPayload<'a>,
}

/// Builds the JSON document submitted to the comparison engine.
///
/// The document contains endpoint secrets and must never be logged.
///
/// # Errors
/// Returns `Serialization` if the request cannot be encoded.
pub fn submission_document(request: &ComparisonRequest) -> Result<Value> {
    let policy = request.policy();
    let payload = SubmissionPayload {
        format_version: SUBMISSION_FORMAT_VERSION,
        request_id: request.request_id().to_string(),
        assembled_at: request.assembled_at().to_rfc3339(),
        source_config: EndpointPayload::new(request.source()),
        target_config: EndpointPayload::new(request.target()),
        comparison_config: PolicyPayload {
            case_sensitive: policy.case_sensitive(),
            ignore_whitespace: policy.ignore_whitespace(),
            ignore_nulls: policy.ignore_nulls(),
            string_similarity_threshold: policy.similarity_threshold(),
            numeric_tolerance: policy.numeric_tolerance(),
            table_mappings: request
                .mappings()
                .iter()
                .map(|mapping| MappingPayload {
                    source_table: &mapping.source_table,
                    target_table: &mapping.target_table,
                    key_columns: mapping.key_columns(),
                    column_mappings: &mapping.column_mappings,
                })
                .collect(),
        },
    };

    serde_json::to_value(&payload)
        .map_err(|e| DbCompareError::serialization("failed to encode comparison request", e))
}
