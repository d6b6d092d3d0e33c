//! Database comparison setup tool.
//!
//! Drives a remote comparison service: checks that both endpoints are
//! reachable, lists their tables, pairs tables by name and submits a
//! comparison request built from a mapping file.
//!
//! # Security Guarantees
//! - Secrets are read from the environment or a prompt, never from flags
//! - No credentials are logged or printed
//! - Submission documents are validated before they leave the process

use anyhow::{Context, bail};
use clap::Parser;
use dbcompare::{
    Cli, Command, CompareArgs, EndpointArgs, PrepareArgs, check_mappings_discovered,
    describe_outcome,
    load_endpoints_with_secrets, load_mappings, load_policy, render_dialects,
    write_mapping_skeleton,
};
use dbcompare_core::{
    EndpointRole, HttpComparisonService, ServiceConfig, SetupContext, SetupReport, assemble,
    initialize_schema_validator, logging::init_logging, probe,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_json)
        .context("Failed to initialize logging")?;

    if let Command::Dialects = cli.command {
        print!("{}", render_dialects());
        return Ok(());
    }

    let settings = cli.service.to_config()?;
    info!("Using comparison service {}", settings);

    match cli.command {
        Command::Test(args) => test_connections(&settings, &args).await,
        Command::Tables(args) => list_tables(&settings, &args).await,
        Command::Prepare(args) => prepare(&settings, &args).await,
        Command::Compare(args) => compare(&settings, &args).await,
        Command::Dialects => Ok(()),
    }
}

fn setup_context(settings: &ServiceConfig) -> anyhow::Result<SetupContext> {
    let service = HttpComparisonService::new(settings)?;
    Ok(SetupContext::new(Arc::new(service), settings.clone()))
}

/// Probes both endpoints concurrently without discovering tables.
async fn test_connections(settings: &ServiceConfig, args: &EndpointArgs) -> anyhow::Result<()> {
    let endpoints = load_endpoints_with_secrets(args)?;
    let service = HttpComparisonService::new(settings)?;
    let source = endpoints.source.with_default_port();
    let target = endpoints.target.with_default_port();

    let (source_result, target_result) = futures::future::join(
        probe(&service, EndpointRole::Source, &source, settings.probe_timeout),
        probe(&service, EndpointRole::Target, &target, settings.probe_timeout),
    )
    .await;

    let mut failed = false;
    for (config, result) in [(&source, source_result), (&target, target_result)] {
        match result {
            Ok(result) if result.is_success() => {
                info!("✓ {} connection test successful", result.role());
                println!("{}: connected to {}", result.role(), config);
            }
            Ok(result) => {
                failed = true;
                if let Some(reason) = result.failure_reason() {
                    error!("{}: {}", result.role(), reason);
                    println!("{}: {}", result.role(), reason);
                }
            }
            Err(e) => {
                failed = true;
                error!("{}", e);
                println!("{e}");
            }
        }
    }

    if failed {
        bail!("Connection test failed");
    }
    Ok(())
}

async fn run_setup(settings: &ServiceConfig, args: &EndpointArgs) -> anyhow::Result<SetupReport> {
    let endpoints = load_endpoints_with_secrets(args)?;
    let ctx = setup_context(settings)?;
    let report = ctx.prepare(endpoints.source, endpoints.target).await;

    for role in [EndpointRole::Source, EndpointRole::Target] {
        println!("{}", describe_outcome(role, report.outcome(role)));
    }
    Ok(report)
}

async fn list_tables(settings: &ServiceConfig, args: &EndpointArgs) -> anyhow::Result<()> {
    let report = run_setup(settings, args).await?;

    for role in [EndpointRole::Source, EndpointRole::Target] {
        if let Some(tables) = report.outcome(role).tables() {
            println!("\n{role} tables:");
            for table in tables {
                println!("  {table}");
            }
        }
    }

    if !(report.source.is_ready() && report.target.is_ready()) {
        bail!("Table discovery did not complete for both endpoints");
    }
    Ok(())
}

async fn prepare(settings: &ServiceConfig, args: &PrepareArgs) -> anyhow::Result<()> {
    let report = run_setup(settings, &args.endpoints).await?;
    let reconciliation = &report.reconciliation;

    println!("\nCommon tables ({}):", reconciliation.mappings.len());
    for mapping in &reconciliation.mappings {
        println!("  {} -> {}", mapping.source_table, mapping.target_table);
    }
    if !reconciliation.unmatched_source.is_empty() {
        println!("Only in source: {}", reconciliation.unmatched_source.join(", "));
    }
    if !reconciliation.unmatched_target.is_empty() {
        println!("Only in target: {}", reconciliation.unmatched_target.join(", "));
    }

    if let Some(path) = &args.write_mappings {
        write_mapping_skeleton(path, reconciliation)?;
        info!("✓ Mapping skeleton written to {}", path.display());
        println!("Add key columns to {} before running compare", path.display());
    }

    if !report.can_proceed() {
        warn!("Setup is incomplete; comparison cannot be submitted yet");
    }
    Ok(())
}

async fn compare(settings: &ServiceConfig, args: &CompareArgs) -> anyhow::Result<()> {
    let mappings = load_mappings(&args.mappings)?;
    let policy = load_policy(args.policy.as_deref())?;
    initialize_schema_validator().context("Failed to initialize submission schema")?;

    let endpoints = load_endpoints_with_secrets(&args.endpoints)?;
    let ctx = setup_context(settings)?;
    let report = ctx.prepare(endpoints.source, endpoints.target).await;
    for role in [EndpointRole::Source, EndpointRole::Target] {
        println!("{}", describe_outcome(role, report.outcome(role)));
    }

    let (source, target) = report.verified_endpoints()?;
    if let (Some(source_tables), Some(target_tables)) =
        (report.source.tables(), report.target.tables())
    {
        check_mappings_discovered(&mappings, source_tables, target_tables)?;
    }
    let request = assemble(source, target, policy, mappings)?;
    info!(
        "Submitting comparison {} with {} table mappings",
        request.request_id(),
        request.mappings().len()
    );

    let ticket = ctx.submit(&request).await?;
    info!("✓ Comparison submitted");
    println!("Comparison id: {}", ticket.comparison_id);

    if args.fetch {
        let outcome = ctx.fetch_outcome(&ticket).await?;
        let rendered = serde_json::to_string_pretty(&outcome.0)
            .context("Failed to render comparison result")?;
        println!("{rendered}");
    }
    Ok(())
}
