//! In-memory record store.

use crate::conflict::{check_new_version, check_update};
use crate::error::{ReadError, ReadResult, WriteError, WriteResult};
use crate::filter::Filter;
use crate::record::{Record, RecordType};
use crate::store::{RecordCursor, RecordStore};
use crate::types::{Key, Version};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use tracing::debug;

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Record sets keyed by type name.
    #[serde(default)]
    pub types: BTreeMap<String, TypeSnapshot>,
}

/// Serializable records of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSnapshot {
    /// Ordered key field names.
    #[serde(default)]
    pub key_fields: Vec<String>,
    /// Records in key order.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl StoreSnapshot {
    /// Returns the record type descriptor for `name`, if present.
    #[must_use]
    pub fn record_type(&self, name: &str) -> Option<RecordType> {
        self.types
            .get(name)
            .map(|t| RecordType::new(name, t.key_fields.iter().cloned()))
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, BTreeMap<Key, Record>>,
    key_fields: BTreeMap<String, Vec<String>>,
    unsupported: HashSet<String>,
}

/// A record store held entirely in memory.
///
/// Suitable for tests, tooling and as a reference implementation of the
/// [`RecordStore`] contract.
///
/// # Thread Safety
///
/// The store can be shared across threads. Scans do not hold the lock
/// between records: each step re-reads the table and resumes after the last
/// key returned, so writes made while a scan is open never block on it.
///
/// # Example
///
/// ```rust
/// use strata_core::{MemoryStore, Record, RecordStore, RecordType};
///
/// let users = RecordType::new("users", ["id"]);
/// let store = MemoryStore::new();
/// store.insert(&users, &Record::new("users", 1)).unwrap();
/// assert_eq!(store.len(&users), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for (name, ty) in snapshot.types {
                let table = inner.tables.entry(name.clone()).or_default();
                for mut record in ty.records {
                    record.type_name = name.clone();
                    table.insert(record.key.clone(), record);
                }
                inner.key_fields.insert(name, ty.key_fields);
            }
        }
        store
    }

    /// Captures the current contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read();
        let types = inner
            .tables
            .iter()
            .map(|(name, table)| {
                let snapshot = TypeSnapshot {
                    key_fields: inner.key_fields.get(name).cloned().unwrap_or_default(),
                    records: table.values().cloned().collect(),
                };
                (name.clone(), snapshot)
            })
            .collect();
        StoreSnapshot { types }
    }

    /// Makes the store reject `type_name` from now on.
    pub fn mark_unsupported(&self, type_name: impl Into<String>) {
        self.inner.write().unsupported.insert(type_name.into());
    }

    /// Returns the number of records of `record_type`.
    #[must_use]
    pub fn len(&self, record_type: &RecordType) -> usize {
        self.inner
            .read()
            .tables
            .get(record_type.name())
            .map_or(0, BTreeMap::len)
    }

    /// Returns true if the store holds no records of `record_type`.
    #[must_use]
    pub fn is_empty(&self, record_type: &RecordType) -> bool {
        self.len(record_type) == 0
    }

    /// Returns all records of `record_type` in key order.
    #[must_use]
    pub fn records(&self, record_type: &RecordType) -> Vec<Record> {
        self.inner
            .read()
            .tables
            .get(record_type.name())
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Writes `record` only if the stored version is still `expected`.
    ///
    /// The record's own version must be strictly greater than the stored
    /// one. Lost updates surface as [`WriteError::OptimisticLock`]; nothing
    /// is retried.
    pub fn update_versioned(
        &self,
        record_type: &RecordType,
        record: &Record,
        expected: Option<Version>,
    ) -> WriteResult<()> {
        self.ensure_supported_for_write(record_type)?;
        let mut inner = self.inner.write();
        let table = inner.tables.entry(record_type.name().to_string()).or_default();
        let saved = match table.get(&record.key) {
            Some(existing) => existing.version,
            None => {
                return Err(WriteError::no_rows_affected(format!(
                    "no {} record with key {}",
                    record_type, record.key
                )))
            }
        };

        if let Err(conflict) = check_update(expected, saved, Some(record))
            .and_then(|()| check_new_version(saved, record.version, Some(record)))
        {
            debug!(record_type = %record_type, key = %record.key, "optimistic lock conflict");
            return Err(conflict.into());
        }

        table.insert(record.key.clone(), stamp(record_type, record));
        Ok(())
    }

    fn ensure_supported_for_read(&self, record_type: &RecordType) -> ReadResult<()> {
        if self.inner.read().unsupported.contains(record_type.name()) {
            return Err(ReadError::unsupported_type(record_type.name()));
        }
        Ok(())
    }

    fn ensure_supported_for_write(&self, record_type: &RecordType) -> WriteResult<()> {
        if self.inner.read().unsupported.contains(record_type.name()) {
            return Err(WriteError::unsupported_type(record_type.name()));
        }
        Ok(())
    }

    /// Returns the first record after `after` that matches `filter`.
    fn next_after(
        &self,
        record_type: &RecordType,
        filter: Option<&Filter>,
        after: Option<&Key>,
    ) -> Option<Record> {
        let inner = self.inner.read();
        let table = inner.tables.get(record_type.name())?;
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        table
            .range::<Key, _>((lower, Bound::Unbounded))
            .map(|(_, record)| record)
            .find(|record| filter.map_or(true, |f| f.matches(record_type, record)))
            .cloned()
    }
}

/// Copies `record`, stamping it with its type name.
fn stamp(record_type: &RecordType, record: &Record) -> Record {
    let mut record = record.clone();
    if record.type_name != record_type.name() {
        record.type_name = record_type.name().to_string();
    }
    record
}

/// Lazily resumes a scan after the last key it returned.
struct MemoryCursor<'a> {
    store: &'a MemoryStore,
    record_type: RecordType,
    filter: Option<Filter>,
    last: Option<Key>,
    done: bool,
}

impl Iterator for MemoryCursor<'_> {
    type Item = ReadResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self
            .store
            .next_after(&self.record_type, self.filter.as_ref(), self.last.as_ref())
        {
            Some(record) => {
                self.last = Some(record.key.clone());
                Some(Ok(record))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn supports(&self, record_type: &RecordType) -> bool {
        !self.inner.read().unsupported.contains(record_type.name())
    }

    fn scan<'a>(
        &'a self,
        record_type: &RecordType,
        filter: Option<&Filter>,
    ) -> ReadResult<RecordCursor<'a>> {
        self.ensure_supported_for_read(record_type)?;
        Ok(Box::new(MemoryCursor {
            store: self,
            record_type: record_type.clone(),
            filter: filter.cloned(),
            last: None,
            done: false,
        }))
    }

    fn get(&self, record_type: &RecordType, key: &Key) -> ReadResult<Option<Record>> {
        self.ensure_supported_for_read(record_type)?;
        Ok(self
            .inner
            .read()
            .tables
            .get(record_type.name())
            .and_then(|t| t.get(key))
            .cloned())
    }

    fn insert(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.ensure_supported_for_write(record_type)?;
        let mut inner = self.inner.write();
        inner
            .key_fields
            .entry(record_type.name().to_string())
            .or_insert_with(|| record_type.key_fields().to_vec());
        let table = inner.tables.entry(record_type.name().to_string()).or_default();
        if table.contains_key(&record.key) {
            return Err(WriteError::persist(format!(
                "duplicate key {} for {}",
                record.key, record_type
            )));
        }
        table.insert(record.key.clone(), stamp(record_type, record));
        Ok(())
    }

    fn update(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.ensure_supported_for_write(record_type)?;
        let mut inner = self.inner.write();
        match inner
            .tables
            .get_mut(record_type.name())
            .and_then(|t| t.get_mut(&record.key))
        {
            Some(slot) => {
                *slot = stamp(record_type, record);
                Ok(())
            }
            None => Err(WriteError::no_rows_affected(format!(
                "no {} record with key {}",
                record_type, record.key
            ))),
        }
    }

    fn delete(&self, record_type: &RecordType, key: &Key) -> WriteResult<()> {
        self.ensure_supported_for_write(record_type)?;
        let mut inner = self.inner.write();
        match inner
            .tables
            .get_mut(record_type.name())
            .and_then(|t| t.remove(key))
        {
            Some(_) => Ok(()),
            None => Err(WriteError::no_rows_affected(format!(
                "no {} record with key {}",
                record_type, key
            ))),
        }
    }
}
