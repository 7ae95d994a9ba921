//! Inspect command implementation.

use super::snapshot;
use std::path::Path;
use std::sync::Arc;
use strata_core::{Declaration, Key, MemoryStore, Record, RecordStore, StoreSnapshot, Value};
use strata_resync::{ResyncConfig, ResyncEngine};

/// Runs the inspect command.
pub fn run(
    master: &Path,
    replica: Option<&Path>,
    record_type: &str,
    key: &[String],
    from_replica: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = collect(master, replica, record_type, key, from_replica)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => print_text_output(&records),
    }

    Ok(())
}

/// Reads the requested records through the engine's store handles.
///
/// With key values only that record is returned; otherwise every record of
/// the type in key order.
pub fn collect(
    master: &Path,
    replica: Option<&Path>,
    record_type: &str,
    key: &[String],
    from_replica: bool,
) -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let master_snapshot = snapshot::load(master)?;
    let replica_snapshot = match replica {
        Some(path) => snapshot::load(path)?,
        None => StoreSnapshot::default(),
    };
    let record_type = snapshot::resolve_type(
        record_type,
        &[&master_snapshot, &replica_snapshot],
        Declaration::Independent,
    )?;

    if !key.is_empty() && key.len() != record_type.key_fields().len() {
        return Err(format!(
            "{} expects {} key value(s), got {}",
            record_type,
            record_type.key_fields().len(),
            key.len()
        )
        .into());
    }

    let engine = ResyncEngine::new(
        Arc::new(MemoryStore::from_snapshot(master_snapshot)),
        Arc::new(MemoryStore::from_snapshot(replica_snapshot)),
        ResyncConfig::default(),
    );
    let store: &dyn RecordStore = if from_replica {
        engine.replica()
    } else {
        engine.master()
    };

    if key.is_empty() {
        let records = store
            .scan(&record_type, None)?
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(records);
    }

    let key = Key::new(key.iter().map(|v| Value::parse_literal(v)).collect());
    match store.get(&record_type, &key)? {
        Some(record) => Ok(vec![record]),
        None => Err(format!("no {} record with key {}", record_type, key).into()),
    }
}

fn print_text_output(records: &[Record]) {
    for record in records {
        let version = record
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}  version={}", record.key_only_text(), version);
        for (name, value) in &record.fields {
            println!("    {name} = {value}");
        }
    }
    println!("{} record(s)", records.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use strata_core::Version;
    use strata_testkit::{populate, users_type, SnapshotDir};

    fn setup() -> (SnapshotDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = SnapshotDir::new();
        let master = MemoryStore::new();
        populate(&master, &users_type(), &BTreeMap::from([(1, 3), (2, 3)]));
        let replica = MemoryStore::new();
        populate(&replica, &users_type(), &BTreeMap::from([(1, 1)]));
        let m = dir.write("master.json", &master);
        let r = dir.write("replica.json", &replica);
        (dir, m, r)
    }

    #[test]
    fn lists_all_master_records() {
        let (_dir, master, _) = setup();
        let records = collect(&master, None, "users", &[], false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, Key::from(1));
    }

    #[test]
    fn reads_single_record_from_replica() {
        let (_dir, master, replica) = setup();
        let records = collect(&master, Some(&replica), "users", &["1".to_string()], true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, Some(Version::new(1)));
    }

    #[test]
    fn missing_key_is_an_error() {
        let (_dir, master, _) = setup();
        let err = collect(&master, None, "users", &["9".to_string()], false).unwrap_err();
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn key_arity_is_checked() {
        let (_dir, master, _) = setup();
        let key = ["1".to_string(), "2".to_string()];
        assert!(collect(&master, None, "users", &key, false).is_err());
    }
}
