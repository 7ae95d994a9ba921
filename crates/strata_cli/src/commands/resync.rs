//! Resync command implementation.

use super::snapshot;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use strata_core::{Declaration, MemoryStore, Value};
use strata_resync::{ResyncConfig, ResyncEngine, ResyncReport};
use tracing::info;

/// What to resynchronize.
#[derive(Debug, Clone)]
pub struct ResyncOptions {
    /// Record type name.
    pub record_type: String,
    /// Fraction of full speed.
    pub speed: f64,
    /// Optional filter expression.
    pub filter: Option<String>,
    /// Literal values for the filter placeholders.
    pub values: Vec<String>,
    /// Check type support on both stores before starting.
    pub authoritative: bool,
}

/// Printable outcome of a resync pass.
#[derive(Debug, Serialize)]
pub struct ResyncSummary {
    /// Record type name.
    pub record_type: String,
    /// Keys compared.
    pub examined: u64,
    /// Records inserted into the replica.
    pub inserted: u64,
    /// Replica records overwritten.
    pub updated: u64,
    /// Replica records deleted.
    pub deleted: u64,
    /// Keys already in sync.
    pub unchanged: u64,
    /// Keys left alone because the replica was newer.
    pub skipped_newer: u64,
    /// Last key reconciled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_key: Option<String>,
    /// Time spent throttling, in milliseconds.
    pub paused_ms: u64,
    /// Duration of the pass, in milliseconds.
    pub elapsed_ms: u64,
}

impl ResyncSummary {
    fn new(record_type: &str, report: &ResyncReport) -> Self {
        Self {
            record_type: record_type.to_string(),
            examined: report.examined,
            inserted: report.inserted,
            updated: report.updated,
            deleted: report.deleted,
            unchanged: report.unchanged,
            skipped_newer: report.skipped_newer,
            last_key: report.last_key.as_ref().map(ToString::to_string),
            paused_ms: report.paused.as_millis() as u64,
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

/// Runs the resync command.
pub fn run(
    master: &Path,
    replica: &Path,
    options: &ResyncOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = execute(master, replica, options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => print_text_output(&summary),
    }

    Ok(())
}

/// Resynchronizes the replica snapshot file and returns the outcome.
///
/// Repairs made before a failure are still written back.
pub fn execute(
    master: &Path,
    replica: &Path,
    options: &ResyncOptions,
) -> Result<ResyncSummary, Box<dyn std::error::Error>> {
    let master_snapshot = snapshot::load(master)?;
    let replica_snapshot = snapshot::load_or_empty(replica)?;

    let declaration = if options.authoritative {
        Declaration::Authoritative
    } else {
        Declaration::Independent
    };
    let record_type = snapshot::resolve_type(
        &options.record_type,
        &[&master_snapshot, &replica_snapshot],
        declaration,
    )?;

    let engine = ResyncEngine::new(
        Arc::new(MemoryStore::from_snapshot(master_snapshot)),
        Arc::new(MemoryStore::from_snapshot(replica_snapshot)),
        ResyncConfig::default(),
    );

    let values: Vec<Value> = options
        .values
        .iter()
        .map(|v| Value::parse_literal(v))
        .collect();
    let result = engine.resync(
        &record_type,
        options.speed,
        options.filter.as_deref(),
        &values,
    );

    snapshot::save(replica, engine.replica())?;
    info!(path = %replica.display(), "replica snapshot written");

    let report = result?;
    Ok(ResyncSummary::new(record_type.name(), &report))
}

fn print_text_output(summary: &ResyncSummary) {
    println!("Resync of '{}'", summary.record_type);
    println!("  Examined:       {}", summary.examined);
    println!("  Inserted:       {}", summary.inserted);
    println!("  Updated:        {}", summary.updated);
    println!("  Deleted:        {}", summary.deleted);
    println!("  Unchanged:      {}", summary.unchanged);
    println!("  Replica newer:  {}", summary.skipped_newer);
    if let Some(key) = &summary.last_key {
        println!("  Last key:       {key}");
    }
    println!("  Throttled:      {} ms", summary.paused_ms);
    println!("  Elapsed:        {} ms", summary.elapsed_ms);
}
