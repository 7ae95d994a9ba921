//! Instrumented store wrappers.
//!
//! Both wrappers delegate to an inner [`RecordStore`] and add observation or
//! fault injection on top.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::{
    CancellationToken, Cause, Filter, Key, ReadError, ReadResult, Record, RecordCursor,
    RecordStore, RecordType, WriteError, WriteResult,
};

/// Counts writes and optionally trips a cancellation token.
pub struct CountingStore<S> {
    inner: S,
    writes: AtomicU64,
    writes_after_cancel: AtomicU64,
    token: Option<CancellationToken>,
    cancel_after: Option<u64>,
}

impl<S: RecordStore> CountingStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: AtomicU64::new(0),
            writes_after_cancel: AtomicU64::new(0),
            token: None,
            cancel_after: None,
        }
    }

    /// Cancels `token` right after the `writes`-th write completes.
    pub fn canceling_after(mut self, writes: u64, token: CancellationToken) -> Self {
        self.token = Some(token);
        self.cancel_after = Some(writes);
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of writes issued, successful or not.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of writes issued after the watched token was canceled.
    pub fn writes_after_cancel(&self) -> u64 {
        self.writes_after_cancel.load(Ordering::SeqCst)
    }

    fn count<T>(&self, write: impl FnOnce() -> WriteResult<T>) -> WriteResult<T> {
        if self.token.as_ref().is_some_and(CancellationToken::is_canceled) {
            self.writes_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
        let result = write();
        let issued = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if let (Some(token), Some(limit)) = (&self.token, self.cancel_after) {
            if issued == limit {
                token.cancel();
            }
        }
        result
    }
}

impl<S: RecordStore> RecordStore for CountingStore<S> {
    fn supports(&self, record_type: &RecordType) -> bool {
        self.inner.supports(record_type)
    }

    fn scan<'a>(
        &'a self,
        record_type: &RecordType,
        filter: Option<&Filter>,
    ) -> ReadResult<RecordCursor<'a>> {
        self.inner.scan(record_type, filter)
    }

    fn get(&self, record_type: &RecordType, key: &Key) -> ReadResult<Option<Record>> {
        self.inner.get(record_type, key)
    }

    fn insert(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.count(|| self.inner.insert(record_type, record))
    }

    fn update(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.count(|| self.inner.update(record_type, record))
    }

    fn delete(&self, record_type: &RecordType, key: &Key) -> WriteResult<()> {
        self.count(|| self.inner.delete(record_type, key))
    }
}

/// Injects read and write failures into an inner store.
pub struct FailingStore<S> {
    inner: S,
    scan_fails_after: Option<usize>,
    write_fails_at: Option<Key>,
}

impl<S: RecordStore> FailingStore<S> {
    /// Wraps `inner` without injecting anything yet.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            scan_fails_after: None,
            write_fails_at: None,
        }
    }

    /// Makes every scan fail once it has yielded `records` records.
    pub fn failing_scan_after(mut self, records: usize) -> Self {
        self.scan_fails_after = Some(records);
        self
    }

    /// Makes every write to `key` fail.
    pub fn failing_writes_at(mut self, key: impl Into<Key>) -> Self {
        self.write_fails_at = Some(key.into());
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn guard(&self, key: &Key) -> WriteResult<()> {
        match &self.write_fails_at {
            Some(failing) if failing == key => Err(WriteError::persist_caused_by(
                format!("injected write failure at {key}"),
                injected_cause(),
            )),
            _ => Ok(()),
        }
    }
}

fn injected_cause() -> Cause {
    Arc::new(io::Error::new(io::ErrorKind::ConnectionReset, "injected"))
}

impl<S: RecordStore> RecordStore for FailingStore<S> {
    fn supports(&self, record_type: &RecordType) -> bool {
        self.inner.supports(record_type)
    }

    fn scan<'a>(
        &'a self,
        record_type: &RecordType,
        filter: Option<&Filter>,
    ) -> ReadResult<RecordCursor<'a>> {
        let cursor = self.inner.scan(record_type, filter)?;
        match self.scan_fails_after {
            None => Ok(cursor),
            Some(records) => {
                let failure = ReadError::fetch_caused_by(
                    format!("injected scan failure after {records} records"),
                    injected_cause(),
                );
                Ok(Box::new(
                    cursor.take(records).chain(std::iter::once(Err(failure))),
                ))
            }
        }
    }

    fn get(&self, record_type: &RecordType, key: &Key) -> ReadResult<Option<Record>> {
        self.inner.get(record_type, key)
    }

    fn insert(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.guard(&record.key)?;
        self.inner.insert(record_type, record)
    }

    fn update(&self, record_type: &RecordType, record: &Record) -> WriteResult<()> {
        self.guard(&record.key)?;
        self.inner.update(record_type, record)
    }

    fn delete(&self, record_type: &RecordType, key: &Key) -> WriteResult<()> {
        self.guard(key)?;
        self.inner.delete(record_type, key)
    }
}
