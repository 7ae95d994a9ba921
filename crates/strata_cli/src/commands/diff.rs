//! Diff command implementation.

use super::snapshot;
use serde::Serialize;
use std::path::Path;
use strata_core::{Declaration, Filter, MemoryStore, Record, RecordStore, Value, Version};
use strata_resync::{MergeCursor, MergeStep, Repair};

/// Repair a resync would make for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Copy the master record into the replica.
    Insert,
    /// Overwrite the replica record.
    Update,
    /// Remove the replica record.
    Delete,
    /// Leave a newer replica record alone.
    SkipNewer,
}

/// One difference between master and replica.
#[derive(Debug, Serialize)]
pub struct Difference {
    /// Record key text, e.g. `users[42]`.
    pub record: String,
    /// What a resync would do.
    pub action: Action,
    /// Master version, if the master has the key.
    pub master_version: Option<i64>,
    /// Replica version, if the replica has the key.
    pub replica_version: Option<i64>,
}

/// Which records a diff covers.
#[derive(Debug, Clone, Default)]
pub struct DiffScope {
    /// Optional filter expression.
    pub filter: Option<String>,
    /// Literal values for the filter placeholders.
    pub values: Vec<String>,
}

/// Runs the diff command.
pub fn run(
    master: &Path,
    replica: &Path,
    record_type: &str,
    scope: &DiffScope,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let differences = compare(master, replica, record_type, scope)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&differences)?);
        }
        _ => print_text_output(&differences),
    }

    Ok(())
}

/// Walks both snapshots in key order and lists every key a resync with the
/// same scope would repair.
pub fn compare(
    master: &Path,
    replica: &Path,
    record_type: &str,
    scope: &DiffScope,
) -> Result<Vec<Difference>, Box<dyn std::error::Error>> {
    let master_snapshot = snapshot::load(master)?;
    let replica_snapshot = snapshot::load_or_empty(replica)?;
    let record_type = snapshot::resolve_type(
        record_type,
        &[&master_snapshot, &replica_snapshot],
        Declaration::Independent,
    )?;

    let values: Vec<Value> = scope.values.iter().map(|v| Value::parse_literal(v)).collect();
    let filter = Filter::optional(scope.filter.as_deref(), &values)?;

    let master = MemoryStore::from_snapshot(master_snapshot);
    let replica = MemoryStore::from_snapshot(replica_snapshot);
    let mut merge = MergeCursor::new(
        master.scan(&record_type, filter.as_ref())?,
        replica.scan(&record_type, filter.as_ref())?,
        true,
    );

    let mut differences = Vec::new();
    loop {
        let step = match merge.next_step() {
            Ok(Some(step)) if filter.is_some() => step.complete(&record_type, &master, &replica),
            Ok(Some(step)) => Ok(step),
            Ok(None) => break,
            Err(failure) => Err(failure),
        };
        let step = step.map_err(|(side, err)| format!("{side} scan failed: {err}"))?;
        if let Some(difference) = describe(&step) {
            differences.push(difference);
        }
    }

    Ok(differences)
}

fn describe(step: &MergeStep) -> Option<Difference> {
    let action = match step.repair() {
        Repair::Insert(_) => Action::Insert,
        Repair::Update(_) => Action::Update,
        Repair::Delete(_) => Action::Delete,
        Repair::SkipNewer => Action::SkipNewer,
        Repair::Keep => return None,
    };
    let (master, replica) = (step.master(), step.replica());
    let record = master
        .or(replica)
        .map(Record::key_only_text)
        .unwrap_or_default();
    Some(Difference {
        record,
        action,
        master_version: master.and_then(|r| r.version).map(Version::as_i64),
        replica_version: replica.and_then(|r| r.version).map(Version::as_i64),
    })
}

fn print_text_output(differences: &[Difference]) {
    let show = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    for difference in differences {
        let action = match difference.action {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::SkipNewer => "skip (replica newer)",
        };
        println!(
            "{:<22} {}  master={} replica={}",
            action,
            difference.record,
            show(difference.master_version),
            show(difference.replica_version)
        );
    }
    println!("{} difference(s)", differences.len());
}
