//! Library module for the `dbcompare` command-line tool.
//!
//! Argument definitions and file/credential loading live here so they can be
//! tested without running the binary. The command handlers are in main.rs.

use clap::{Args, Parser, Subcommand};
use dbcompare_core::dialect;
use dbcompare_core::models::{
    ComparisonPolicy, EndpointConfig, EndpointRole, TableList, TableMapping,
};
use dbcompare_core::orchestrator::PipelineOutcome;
use dbcompare_core::reconcile::Reconciliation;
use dbcompare_core::{DbCompareError, Result, ServiceConfig};
use serde::Deserialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the source endpoint secret
pub const SOURCE_PASSWORD_ENV: &str = "DBCOMPARE_SOURCE_PASSWORD";

/// Environment variable holding the target endpoint secret
pub const TARGET_PASSWORD_ENV: &str = "DBCOMPARE_TARGET_PASSWORD";

/// CLI argument structure
#[derive(Parser)]
#[command(name = "dbcompare")]
#[command(about = "Prepare and submit database comparisons")]
#[command(version)]
#[command(long_about = "
DBCompare - comparison setup for two databases

Verifies that the comparison service can reach a source and a target
database, discovers the tables on each side, pairs tables with matching
names and submits a comparison request.

ENDPOINT FILE:
  {
    \"source\": { \"dbType\": \"oracle\", \"host\": \"ora\", \"database\": \"ORCLPDB1\",
                \"username\": \"scott\", \"schemaFilter\": \"HR\" },
    \"target\": { \"dbType\": \"postgresql\", \"host\": \"pg\", \"database\": \"app\",
                \"username\": \"reader\" }
  }

Secrets may be omitted from the file and supplied through
DBCOMPARE_SOURCE_PASSWORD / DBCOMPARE_TARGET_PASSWORD or an interactive prompt.

EXAMPLES:
  dbcompare test --endpoints endpoints.json
  dbcompare prepare --endpoints endpoints.json --write-mappings mappings.json
  dbcompare compare --endpoints endpoints.json --mappings mappings.json --fetch
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Check connectivity to both endpoints
    Test(EndpointArgs),
    /// Check connectivity and list the tables on both endpoints
    Tables(EndpointArgs),
    /// Run the full setup and show the common tables
    Prepare(PrepareArgs),
    /// Run setup, assemble a request from a mapping file and submit it
    Compare(CompareArgs),
    /// Show the per-dialect defaults
    Dialects,
}

/// Verbosity and log format flags
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Where the comparison service lives and how long to wait for it
#[derive(Args)]
pub struct ServiceArgs {
    /// Base URL of the comparison service
    #[arg(
        long,
        global = true,
        env = "DBCOMPARE_SERVICE_URL",
        default_value = dbcompare_core::config::DEFAULT_SERVICE_URL
    )]
    pub service_url: String,

    /// Bound in seconds for each connectivity check and table request
    #[arg(long, global = true, env = "DBCOMPARE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Row cap sent with table requests
    #[arg(long, global = true, env = "DBCOMPARE_ROW_LIMIT", default_value_t = 1000)]
    pub row_limit: u32,
}

impl ServiceArgs {
    /// Builds and validates the service configuration.
    ///
    /// # Errors
    /// Returns `Configuration` if the URL, bound or row cap is unusable.
    pub fn to_config(&self) -> Result<ServiceConfig> {
        let config = ServiceConfig::new(self.service_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_row_limit(self.row_limit);
        config.validate()?;
        Ok(config)
    }
}

/// Endpoint file argument
#[derive(Args)]
pub struct EndpointArgs {
    /// JSON file with `source` and `target` endpoints
    #[arg(short, long, value_name = "FILE")]
    pub endpoints: PathBuf,

    /// Never prompt for missing secrets
    #[arg(long)]
    pub no_prompt: bool,
}

/// Arguments for `prepare`
#[derive(Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub endpoints: EndpointArgs,

    /// Write the common tables as a mapping skeleton to fill in
    #[arg(long, value_name = "FILE")]
    pub write_mappings: Option<PathBuf>,
}

/// Arguments for `compare`
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub endpoints: EndpointArgs,

    /// JSON file with table mappings (including key columns)
    #[arg(short, long, value_name = "FILE")]
    pub mappings: PathBuf,

    /// JSON file with comparison policy; defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Fetch and print the comparison result after submitting
    #[arg(long)]
    pub fetch: bool,
}

/// Source and target endpoints as stored in an endpoint file.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsFile {
    pub source: EndpointConfig,
    pub target: EndpointConfig,
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DbCompareError::Io {
        context: format!("Failed to read {}", path.display()),
        source: e,
    })
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|e| {
        DbCompareError::serialization(format!("Invalid {what} file {}", path.display()), e)
    })
}

/// Loads the source/target endpoint file.
///
/// # Errors
/// Returns `Io` if the file cannot be read and `Serialization` if it is not
/// a valid endpoint file.
pub fn load_endpoints(path: &Path) -> Result<EndpointsFile> {
    parse_file(path, "endpoint")
}

/// Loads table mappings from a JSON array.
///
/// # Errors
/// Returns `Io` or `Serialization` on unreadable or malformed input.
pub fn load_mappings(path: &Path) -> Result<Vec<TableMapping>> {
    parse_file(path, "mapping")
}

/// Loads a comparison policy, or the defaults when no file is given.
///
/// # Errors
/// Returns `Io` or `Serialization`; out-of-range values are rejected while
/// parsing.
pub fn load_policy(path: Option<&Path>) -> Result<ComparisonPolicy> {
    match path {
        Some(path) => parse_file(path, "policy"),
        None => Ok(ComparisonPolicy::default()),
    }
}

/// Environment variable consulted for a role's secret.
pub fn password_env(role: EndpointRole) -> &'static str {
    match role {
        EndpointRole::Source => SOURCE_PASSWORD_ENV,
        EndpointRole::Target => TARGET_PASSWORD_ENV,
    }
}

/// Fills in a missing secret from the environment or, if allowed and
/// attached to a terminal, an interactive prompt.
///
/// A secret already present in the file is kept. An endpoint may end up
/// without a secret; the service decides whether that is acceptable.
///
/// # Errors
/// Returns `Configuration` if the prompt cannot be read.
pub fn resolve_secret(
    config: EndpointConfig,
    role: EndpointRole,
    allow_prompt: bool,
) -> Result<EndpointConfig> {
    if config.credentials.has_secret() {
        return Ok(config);
    }

    if let Ok(secret) = std::env::var(password_env(role))
        && !secret.is_empty()
    {
        let credentials = config.credentials.with_secret(secret);
        return Ok(EndpointConfig {
            credentials,
            ..config
        });
    }

    if allow_prompt && std::io::stdin().is_terminal() {
        let prompt = format!("Password for {role} user {}: ", config.credentials.username());
        let secret = rpassword::prompt_password(prompt).map_err(|e| {
            DbCompareError::configuration(format!("Failed to read password: {e}"))
        })?;
        let credentials = config.credentials.with_secret(secret);
        return Ok(EndpointConfig {
            credentials,
            ..config
        });
    }

    Ok(config)
}

/// Loads an endpoint file and resolves both secrets.
///
/// # Errors
/// Propagates loading and prompt errors.
pub fn load_endpoints_with_secrets(args: &EndpointArgs) -> Result<EndpointsFile> {
    let file = load_endpoints(&args.endpoints)?;
    Ok(EndpointsFile {
        source: resolve_secret(file.source, EndpointRole::Source, !args.no_prompt)?,
        target: resolve_secret(file.target, EndpointRole::Target, !args.no_prompt)?,
    })
}

/// Writes the reconciled tables as a mapping file for the user to complete.
///
/// # Errors
/// Returns `Serialization` or `Io` if the file cannot be written.
pub fn write_mapping_skeleton(path: &Path, reconciliation: &Reconciliation) -> Result<()> {
    let json = serde_json::to_string_pretty(&reconciliation.mappings)
        .map_err(|e| DbCompareError::serialization("Failed to encode mapping skeleton", e))?;
    std::fs::write(path, json).map_err(|e| DbCompareError::Io {
        context: format!("Failed to write {}", path.display()),
        source: e,
    })
}

/// Checks that every mapping names a table discovered on its side.
///
/// # Errors
/// Returns `Assembly` listing each mapping whose source or target table was
/// not discovered.
pub fn check_mappings_discovered(
    mappings: &[TableMapping],
    source_tables: &TableList,
    target_tables: &TableList,
) -> Result<()> {
    let known = |tables: &TableList, name: &str| {
        let name = name.trim().to_lowercase();
        tables.iter().any(|table| *table == name)
    };

    let missing: Vec<String> = mappings
        .iter()
        .filter(|m| {
            !known(source_tables, &m.source_table) || !known(target_tables, &m.target_table)
        })
        .map(|m| format!("{} -> {}", m.source_table, m.target_table))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DbCompareError::assembly(format!(
            "mappings reference tables that were not discovered: {}",
            missing.join(", ")
        )))
    }
}

/// One-line summary of a pipeline outcome.
pub fn describe_outcome(role: EndpointRole, outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Ready { tables, .. } => {
            format!("{role}: connected, {} tables", tables.len())
        }
        PipelineOutcome::Failed { reason, .. } => format!("{role}: {reason}"),
        PipelineOutcome::Superseded => format!("{role}: superseded by a newer check"),
    }
}

/// Renders the dialect policy table.
pub fn render_dialects() -> String {
    let mut out = format!(
        "{:<12} {:>6}  {:<15}  {}\n",
        "DIALECT", "PORT", "SCHEMA FILTER", "DISCOVERY"
    );
    for policy in dialect::policies() {
        let discovery = match policy.strategy {
            dialect::DiscoveryStrategy::Listing => "table listing",
            dialect::DiscoveryStrategy::FilteredQueryWithFallback => {
                "owner query, then current-user fallback"
            }
        };
        out.push_str(&format!(
            "{:<12} {:>6}  {:<15}  {}\n",
            policy.dialect.as_str(),
            policy.default_port,
            if policy.mandatory_filter { "required" } else { "optional" },
            discovery
        ));
    }
    out
}
