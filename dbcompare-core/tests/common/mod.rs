//! Shared fixtures for integration tests: a scripted in-memory comparison
//! service that records every call it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use dbcompare_core::models::{
    ComparisonOutcome, ComparisonRequest, ComparisonTicket, Dialect, EndpointConfig, EndpointRole,
};
use dbcompare_core::security::Credentials;
use dbcompare_core::service::{CatalogRow, ComparisonService, DiscoveryResponse};
use dbcompare_core::{DbCompareError, Result};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Script<T> {
    /// Answer immediately
    Reply(T),
    /// Answer after a (virtual) delay
    After(Duration, T),
    /// Fail with a transport-style error
    Fail(String),
    /// Never answer
    Hang,
}

/// A call the service received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe(EndpointRole),
    Listing(EndpointRole),
    Query(EndpointRole, String),
    Submit,
    Fetch(String),
}

type Scripts<T> = Mutex<HashMap<EndpointRole, VecDeque<Script<T>>>>;

/// In-memory service answering from per-role scripts.
///
/// Each role's scripts are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedService {
    probes: Scripts<bool>,
    listings: Scripts<DiscoveryResponse>,
    queries: Scripts<Vec<CatalogRow>>,
    calls: Mutex<Vec<Call>>,
    outcome: Mutex<Option<Value>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(self, role: EndpointRole, script: Script<bool>) -> Self {
        push(&self.probes, role, script);
        self
    }

    pub fn listing(self, role: EndpointRole, script: Script<DiscoveryResponse>) -> Self {
        push(&self.listings, role, script);
        self
    }

    pub fn query(self, role: EndpointRole, script: Script<Vec<CatalogRow>>) -> Self {
        push(&self.queries, role, script);
        self
    }

    pub fn outcome(self, value: Value) -> Self {
        *self.outcome.lock().unwrap() = Some(value);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probe_calls(&self, role: EndpointRole) -> usize {
        self.count(|call| *call == Call::Probe(role))
    }

    pub fn listing_calls(&self, role: EndpointRole) -> usize {
        self.count(|call| *call == Call::Listing(role))
    }

    pub fn queries_sent(&self, role: EndpointRole) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(r, query) if r == role => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn submit_calls(&self) -> usize {
        self.count(|call| *call == Call::Submit)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn push<T>(scripts: &Scripts<T>, role: EndpointRole, script: Script<T>) {
    scripts
        .lock()
        .unwrap()
        .entry(role)
        .or_default()
        .push_back(script);
}

fn next<T: Clone>(scripts: &Scripts<T>, role: EndpointRole) -> Option<Script<T>> {
    let mut scripts = scripts.lock().unwrap();
    let queue = scripts.get_mut(&role)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

async fn play<T>(script: Option<Script<T>>, role: EndpointRole) -> Result<T> {
    match script {
        Some(Script::Reply(value)) => Ok(value),
        Some(Script::After(delay, value)) => {
            tokio::time::sleep(delay).await;
            Ok(value)
        }
        Some(Script::Fail(message)) => Err(DbCompareError::transport(
            "scripted failure",
            std::io::Error::other(message),
        )),
        Some(Script::Hang) => std::future::pending().await,
        None => Err(DbCompareError::transport(
            format!("no script for {role}"),
            std::io::Error::other("unscripted call"),
        )),
    }
}

#[async_trait]
impl ComparisonService for ScriptedService {
    async fn check_connection(&self, role: EndpointRole, _config: &EndpointConfig) -> Result<bool> {
        self.record(Call::Probe(role));
        let script = next(&self.probes, role);
        play(script, role).await
    }

    async fn list_tables(
        &self,
        role: EndpointRole,
        _config: &EndpointConfig,
    ) -> Result<DiscoveryResponse> {
        self.record(Call::Listing(role));
        let script = next(&self.listings, role);
        play(script, role).await
    }

    async fn run_catalog_query(
        &self,
        role: EndpointRole,
        _config: &EndpointConfig,
        query: &str,
    ) -> Result<Vec<CatalogRow>> {
        self.record(Call::Query(role, query.to_string()));
        let script = next(&self.queries, role);
        play(script, role).await
    }

    async fn submit_comparison(&self, _request: &ComparisonRequest) -> Result<ComparisonTicket> {
        self.record(Call::Submit);
        Ok(ComparisonTicket {
            comparison_id: "cmp-1".to_string(),
        })
    }

    async fn fetch_outcome(&self, ticket: &ComparisonTicket) -> Result<ComparisonOutcome> {
        self.record(Call::Fetch(ticket.comparison_id.clone()));
        let value = self.outcome.lock().unwrap().clone().unwrap_or(Value::Null);
        Ok(ComparisonOutcome(value))
    }
}

pub fn postgres_endpoint() -> EndpointConfig {
    EndpointConfig::new(
        Dialect::PostgreSql,
        "pg.local",
        "app",
        Credentials::new("reader", "pg-secret"),
    )
}

pub fn mysql_endpoint() -> EndpointConfig {
    EndpointConfig::new(
        Dialect::MySql,
        "mysql.local",
        "shop",
        Credentials::new("root", "mysql-secret"),
    )
}

pub fn oracle_endpoint(filter: Option<&str>) -> EndpointConfig {
    let config = EndpointConfig::new(
        Dialect::Oracle,
        "ora.local",
        "ORCLPDB1",
        Credentials::new("scott", "tiger"),
    );
    match filter {
        Some(filter) => config.with_schema_filter(filter),
        None => config,
    }
}

pub fn flat(names: &[&str]) -> DiscoveryResponse {
    DiscoveryResponse::FlatList(names.iter().map(|n| (*n).to_string()).collect())
}

pub fn rows(values: Value) -> Vec<CatalogRow> {
    match values {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn table_rows(names: &[&str]) -> Vec<CatalogRow> {
    rows(Value::Array(
        names.iter().map(|n| json!({ "TABLE_NAME": n })).collect(),
    ))
}
