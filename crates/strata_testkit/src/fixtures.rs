//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up master/replica store pairs
//! and snapshot files on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_core::{MemoryStore, Record, RecordStore, RecordType, StoreSnapshot, Value, Version};
use tempfile::TempDir;

/// The record type most tests use: `users` keyed by `id`.
pub fn users_type() -> RecordType {
    RecordType::new("users", ["id"])
}

/// Builds a `type_name` record with integer key `id` at `version`.
///
/// The payload field differs per version so content comparisons see a
/// change whenever the version does.
pub fn versioned_record(type_name: &str, id: i64, version: i64) -> Record {
    Record::new(type_name, id)
        .with_version(Version::new(version))
        .with_field("payload", format!("{type_name}-{id}-v{version}"))
}

/// Inserts one versioned record per `(id, version)` entry.
pub fn populate(store: &MemoryStore, record_type: &RecordType, entries: &BTreeMap<i64, i64>) {
    for (id, version) in entries {
        store
            .insert(record_type, &versioned_record(record_type.name(), *id, *version))
            .expect("Failed to populate store");
    }
}

/// Creates a master and a replica store holding the given records.
pub fn store_pair(
    record_type: &RecordType,
    master: &BTreeMap<i64, i64>,
    replica: &BTreeMap<i64, i64>,
) -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    let master_store = MemoryStore::new();
    populate(&master_store, record_type, master);
    let replica_store = MemoryStore::new();
    populate(&replica_store, record_type, replica);
    (Arc::new(master_store), Arc::new(replica_store))
}

/// Reads back `id -> version` for every record of `record_type`.
///
/// Unversioned records map to `None`.
pub fn key_versions(store: &MemoryStore, record_type: &RecordType) -> BTreeMap<i64, Option<i64>> {
    store
        .records(record_type)
        .into_iter()
        .filter_map(|record| match record.key.values() {
            [Value::Integer(id)] => Some((*id, record.version.map(Version::as_i64))),
            _ => None,
        })
        .collect()
}

/// A temporary directory for JSON store snapshots.
pub struct SnapshotDir {
    dir: TempDir,
}

impl SnapshotDir {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes the contents of `store` to `name` and returns the file path.
    pub fn write(&self, name: &str, store: &MemoryStore) -> PathBuf {
        let path = self.dir.path().join(name);
        let json =
            serde_json::to_string_pretty(&store.snapshot()).expect("Failed to encode snapshot");
        std::fs::write(&path, json).expect("Failed to write snapshot");
        path
    }

    /// Reads a snapshot file back into a store.
    pub fn read(&self, path: &Path) -> MemoryStore {
        let json = std::fs::read_to_string(path).expect("Failed to read snapshot");
        let snapshot: StoreSnapshot =
            serde_json::from_str(&json).expect("Failed to decode snapshot");
        MemoryStore::from_snapshot(snapshot)
    }
}

impl Default for SnapshotDir {
    fn default() -> Self {
        Self::new()
    }
}
