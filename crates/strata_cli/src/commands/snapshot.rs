//! Snapshot file loading and saving.

use std::io;
use std::path::{Path, PathBuf};
use strata_core::{Declaration, MemoryStore, RecordType, StoreSnapshot};
use thiserror::Error;

/// Errors from reading or writing snapshot files.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read or written.
    #[error("cannot access snapshot {path:?}: {source}")]
    Io {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("malformed snapshot {path:?}: {source}")]
    Json {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// No snapshot describes the requested type.
    #[error("record type '{0}' not found in any snapshot")]
    UnknownType(String),
}

/// Reads a snapshot file.
pub fn load(path: &Path) -> Result<StoreSnapshot, SnapshotError> {
    let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a snapshot file, treating a missing file as an empty store.
pub fn load_or_empty(path: &Path) -> Result<StoreSnapshot, SnapshotError> {
    if path.exists() {
        load(path)
    } else {
        Ok(StoreSnapshot::default())
    }
}

/// Writes the contents of `store` to `path`.
pub fn save(path: &Path, store: &MemoryStore) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(&store.snapshot()).map_err(|source| {
        SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    std::fs::write(path, json).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Finds the descriptor for `name` in the first snapshot that has it.
pub fn resolve_type(
    name: &str,
    snapshots: &[&StoreSnapshot],
    declaration: Declaration,
) -> Result<RecordType, SnapshotError> {
    snapshots
        .iter()
        .find_map(|snapshot| snapshot.record_type(name))
        .map(|record_type| record_type.with_declaration(declaration))
        .ok_or_else(|| SnapshotError::UnknownType(name.to_string()))
}
