//! Reconciliation of source and target table lists.

use crate::models::{TableList, TableMapping};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Result of reconciling two table lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Matched pairs in source order, without column mappings
    pub mappings: Vec<TableMapping>,
    /// Source tables with no counterpart
    pub unmatched_source: Vec<String>,
    /// Target tables with no counterpart
    pub unmatched_target: Vec<String>,
}

impl Reconciliation {
    /// True when source and target share no tables.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Pairs source tables with target tables of the same name, ignoring case.
///
/// The output follows source order and omits source tables without a
/// match. An empty result is not an error here; the assembler rejects it.
pub fn reconcile(source: &TableList, target: &TableList) -> Vec<TableMapping> {
    reconcile_report(source, target).mappings
}

/// Like [`reconcile`], also reporting the tables left unmatched on each side.
pub fn reconcile_report(source: &TableList, target: &TableList) -> Reconciliation {
    let mut target_index: HashMap<String, &str> = HashMap::with_capacity(target.len());
    for name in target {
        target_index.entry(name.to_lowercase()).or_insert(name);
    }

    let mut report = Reconciliation::default();
    let mut matched_targets = HashSet::new();

    for source_name in source {
        let key = source_name.to_lowercase();
        match target_index.get(&key) {
            Some(target_name) => {
                report
                    .mappings
                    .push(TableMapping::new(source_name.as_str(), *target_name));
                matched_targets.insert(key);
            }
            None => report.unmatched_source.push(source_name.clone()),
        }
    }

    report.unmatched_target = target
        .iter()
        .filter(|name| !matched_targets.contains(&name.to_lowercase()))
        .cloned()
        .collect();

    report
}
