//! Record store contract.

use crate::error::{ReadResult, WriteResult};
use crate::filter::Filter;
use crate::record::{Record, RecordType};
use crate::types::Key;
use std::sync::Arc;

/// A key-ordered stream of records produced by [`RecordStore::scan`].
pub type RecordCursor<'a> = Box<dyn Iterator<Item = ReadResult<Record>> + 'a>;

/// A logical record store.
///
/// This is the narrow surface the consistency core needs from a storage
/// backend. Schema mapping, query translation and transport stay behind it.
///
/// # Contract
///
/// - `scan` yields records of one type in ascending key order, restricted to
///   those matching the filter when one is given.
/// - `insert`, `update` and `delete` each affect exactly one record and are
///   atomic for that record.
/// - Failures are reported with the read and write failure families; a
///   write aimed at a missing key is [`WriteKind::NoRowsAffected`].
///
/// [`WriteKind::NoRowsAffected`]: crate::error::WriteKind::NoRowsAffected
pub trait RecordStore: Send + Sync {
    /// Returns true if the store can map `record_type`.
    fn supports(&self, record_type: &RecordType) -> bool {
        let _ = record_type;
        true
    }

    /// Streams the records of `record_type` in key order.
    fn scan<'a>(
        &'a self,
        record_type: &RecordType,
        filter: Option<&Filter>,
    ) -> ReadResult<RecordCursor<'a>>;

    /// Fetches a single record by key.
    fn get(&self, record_type: &RecordType, key: &Key) -> ReadResult<Option<Record>>;

    /// Inserts a record whose key is not present yet.
    fn insert(&self, record_type: &RecordType, record: &Record) -> WriteResult<()>;

    /// Replaces the record stored under `record.key`.
    fn update(&self, record_type: &RecordType, record: &Record) -> WriteResult<()>;

    /// Deletes the record stored under `key`.
    fn delete(&self, record_type: &RecordType, key: &Key) -> WriteResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn supports(&self, record_type: &RecordType) -> bool {
        (**self).supports(record_type)
    }

    fn scan<'a>(
        &'a self,
        record_type: &RecordType,
        filter: Option<&Filter>,
    ) -> ReadResult<RecordCursor<'a>> {
        (**self).scan(record_type, filter)
    }

    fn get(&self, record_type: &RecordType, key: &Key) -> ReadResult<Option<Record>> {
        (**self).get(record_type, key)
    }

    fn insert(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        (**self).insert(record_type, record)
    }

    fn update(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        (**self).update(record_type, record)
    }

    fn delete(&self, record_type: &RecordType, key: &Key) -> WriteResult<()> {
        (**self).delete(record_type, key)
    }
}
