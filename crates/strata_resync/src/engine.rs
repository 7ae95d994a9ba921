//! The resync engine.

use crate::config::ResyncConfig;
use crate::error::{ResyncError, ResyncResult};
use crate::merge::{MergeCursor, MergeStep, Repair};
use crate::throttle::Throttle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_core::{
    CancellationToken, Declaration, Filter, Key, ReadError, RecordStore, RecordType, Value,
    WriteError, WriteResult,
};
use tracing::{debug, info, warn};

/// Parameters of one resync pass.
#[derive(Debug, Clone)]
pub struct ResyncRequest {
    record_type: RecordType,
    desired_speed: f64,
    filter: Option<Filter>,
    token: CancellationToken,
}

impl ResyncRequest {
    /// Creates an unthrottled, unfiltered request for `record_type`.
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            desired_speed: 1.0,
            filter: None,
            token: CancellationToken::new(),
        }
    }

    /// Sets the fraction of full speed, in `(0.0, 1.0]`.
    pub fn with_speed(mut self, desired_speed: f64) -> Self {
        self.desired_speed = desired_speed;
        self
    }

    /// Restricts the pass to records matching `filter`.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Uses `token` to stop the pass from another thread.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The record type to resynchronize.
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }
}

/// Outcome of a completed resync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResyncReport {
    /// Keys compared.
    pub examined: u64,
    /// Records copied to the replica because it lacked them.
    pub inserted: u64,
    /// Stale replica records overwritten with the master copy.
    pub updated: u64,
    /// Replica records removed because the master no longer has them.
    pub deleted: u64,
    /// Keys already in sync.
    pub unchanged: u64,
    /// Keys where the replica held a newer version and was left alone.
    pub skipped_newer: u64,
    /// Last key reconciled.
    pub last_key: Option<Key>,
    /// Time spent idling for throttling.
    pub paused: Duration,
    /// Wall-clock duration of the pass.
    pub elapsed: Duration,
}

impl ResyncReport {
    /// Number of replica writes performed.
    pub fn writes(&self) -> u64 {
        self.inserted + self.updated + self.deleted
    }
}

/// Repairs a replica store by re-synchronizing it against a master store.
///
/// A pass walks the master and replica scans of one record type in key
/// order and makes the replica agree with the master:
///
/// - keys only on the master are inserted into the replica,
/// - keys only on the replica are deleted from it,
/// - keys on both are overwritten when the master version is newer (or, for
///   unversioned records, when the content differs).
///
/// With a filter, a key the filter admits on one side only is looked up on
/// the other side by key before deciding, so a replica copy whose fields no
/// longer match is updated rather than duplicated or removed.
///
/// The replica is never moved back to an older version. Each repair is an
/// independent single-record write, so an interrupted pass can be re-run at
/// any time. The engine keeps no state between passes; passes over different
/// record types may run concurrently.
pub struct ResyncEngine<M: RecordStore, R: RecordStore> {
    master: Arc<M>,
    replica: Arc<R>,
    config: ResyncConfig,
}

impl<M: RecordStore, R: RecordStore> ResyncEngine<M, R> {
    /// Creates a new resync engine.
    pub fn new(master: Arc<M>, replica: Arc<R>, config: ResyncConfig) -> Self {
        Self {
            master,
            replica,
            config,
        }
    }

    /// The master store, for manual side-by-side inspection.
    ///
    /// Writing through this handle bypasses replica consistency.
    pub fn master(&self) -> &M {
        &self.master
    }

    /// The replica store.
    pub fn replica(&self) -> &R {
        &self.replica
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ResyncConfig {
        &self.config
    }

    /// Resynchronizes `record_type` at `desired_speed`, optionally scoped by
    /// a filter expression and its positional values.
    pub fn resync(
        &self,
        record_type: &RecordType,
        desired_speed: f64,
        filter: Option<&str>,
        filter_values: &[Value],
    ) -> ResyncResult<ResyncReport> {
        let mut request = ResyncRequest::new(record_type.clone()).with_speed(desired_speed);
        if let Some(filter) = Filter::optional(filter, filter_values)? {
            request = request.with_filter(filter);
        }
        self.run(request)
    }

    /// Runs a resync pass.
    pub fn run(&self, request: ResyncRequest) -> ResyncResult<ResyncReport> {
        let ResyncRequest {
            record_type,
            desired_speed,
            filter,
            token,
        } = request;

        if !Throttle::is_valid_speed(desired_speed) {
            return Err(ResyncError::InvalidRequest(format!(
                "desired speed must be in (0.0, 1.0], got {desired_speed}"
            )));
        }

        let start = Instant::now();
        let scope = filter
            .as_ref()
            .map_or_else(|| "all records".to_string(), ToString::to_string);
        info!(
            record_type = %record_type,
            speed = desired_speed,
            scope = %scope,
            "starting resync"
        );

        self.acquire(&record_type)?;

        let read_failure = |source: ReadError, last_key: &Option<Key>| ResyncError::Read {
            record_type: record_type.name().to_string(),
            last_key: last_key.clone(),
            source,
        };
        let check = |last_key: &Option<Key>| {
            token.check().map_err(|source| {
                info!(record_type = %record_type, "resync canceled");
                read_failure(source, last_key)
            })
        };

        let mut report = ResyncReport::default();
        check(&report.last_key)?;

        let master_scan = self
            .master
            .scan(&record_type, filter.as_ref())
            .map_err(|e| read_failure(e, &None))?;
        let replica_scan = self
            .replica
            .scan(&record_type, filter.as_ref())
            .map_err(|e| read_failure(e, &None))?;

        let mut merge = MergeCursor::new(master_scan, replica_scan, self.config.check_order);
        let mut throttle = Throttle::new(desired_speed, self.config.max_pause);

        loop {
            check(&report.last_key)?;

            let unit_start = Instant::now();
            let step = match merge.next_step() {
                Ok(Some(step)) if filter.is_some() => {
                    step.complete(&record_type, &*self.master, &*self.replica)
                }
                Ok(Some(step)) => Ok(step),
                Ok(None) => break,
                Err(failure) => Err(failure),
            };
            let step = match step {
                Ok(step) => step,
                Err((side, source)) => {
                    warn!(record_type = %record_type, %side, error = %source, "resync scan failed");
                    return Err(read_failure(source, &report.last_key));
                }
            };

            // The scan may have blocked; no repair once cancellation is visible.
            check(&report.last_key)?;

            let key = step.key().clone();
            if let Err(source) = self.reconcile(&record_type, &step, &mut report) {
                warn!(record_type = %record_type, key = %key, error = %source, "resync repair failed");
                return Err(ResyncError::Write {
                    record_type: record_type.name().to_string(),
                    last_key: report.last_key.clone(),
                    source,
                });
            }
            report.examined += 1;
            report.last_key = Some(key);

            if self.config.progress_interval > 0
                && report.examined % self.config.progress_interval == 0
            {
                info!(
                    record_type = %record_type,
                    examined = report.examined,
                    writes = report.writes(),
                    "resync progress"
                );
            }

            if throttle.pace(unit_start.elapsed(), &token) {
                check(&report.last_key)?;
            }
        }

        report.paused = throttle.paused();
        report.elapsed = start.elapsed();
        info!(
            record_type = %record_type,
            examined = report.examined,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            unchanged = report.unchanged,
            skipped_newer = report.skipped_newer,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "resync complete"
        );
        Ok(report)
    }

    /// Eagerly rejects authoritative types a store cannot map.
    ///
    /// Independent types are left to fail on first access.
    fn acquire(&self, record_type: &RecordType) -> ResyncResult<()> {
        if record_type.declaration() != Declaration::Authoritative {
            return Ok(());
        }
        if !self.master.supports(record_type) {
            return Err(ResyncError::Read {
                record_type: record_type.name().to_string(),
                last_key: None,
                source: ReadError::unsupported_type(record_type.name()),
            });
        }
        if !self.replica.supports(record_type) {
            return Err(ResyncError::Write {
                record_type: record_type.name().to_string(),
                last_key: None,
                source: WriteError::unsupported_type(record_type.name()),
            });
        }
        Ok(())
    }

    /// Brings one key of the replica in line with the master.
    fn reconcile(
        &self,
        record_type: &RecordType,
        step: &MergeStep,
        report: &mut ResyncReport,
    ) -> WriteResult<()> {
        let replica_version = step.replica().and_then(|r| r.version);
        match step.repair() {
            Repair::Insert(master) => {
                debug!(key = %master.key, "inserting record missing from replica");
                self.replica.insert(record_type, master)?;
                report.inserted += 1;
            }
            Repair::Delete(key) => {
                debug!(key = %key, "deleting record absent from master");
                self.replica.delete(record_type, key)?;
                report.deleted += 1;
            }
            Repair::Update(master) => {
                debug!(
                    key = %master.key,
                    from = ?replica_version,
                    to = ?master.version,
                    "updating stale replica record"
                );
                self.replica.update(record_type, master)?;
                report.updated += 1;
            }
            Repair::Keep => report.unchanged += 1,
            Repair::SkipNewer => {
                warn!(
                    record_type = %record_type,
                    key = %step.key(),
                    master = ?step.master().and_then(|m| m.version),
                    replica = ?replica_version,
                    "replica record is newer than master; leaving it in place"
                );
                report.skipped_newer += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{MemoryStore, Record, Version};

    fn users() -> RecordType {
        RecordType::new("users", ["id"])
    }

    fn user(id: i64, version: i64) -> Record {
        Record::new("users", id).with_version(Version::new(version))
    }

    fn engine(
        master: &[(i64, i64)],
        replica: &[(i64, i64)],
    ) -> ResyncEngine<MemoryStore, MemoryStore> {
        let m = MemoryStore::new();
        for (id, v) in master {
            m.insert(&users(), &user(*id, *v)).unwrap();
        }
        let r = MemoryStore::new();
        for (id, v) in replica {
            r.insert(&users(), &user(*id, *v)).unwrap();
        }
        ResyncEngine::new(Arc::new(m), Arc::new(r), ResyncConfig::default())
    }

    #[test]
    fn converges_replica() {
        let engine = engine(&[(1, 1), (2, 5), (3, 2)], &[(2, 4), (3, 2), (4, 1)]);
        let report = engine.resync(&users(), 1.0, None, &[]).unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.examined, 4);
        assert_eq!(report.last_key, Some(Key::from(4)));
        assert_eq!(engine.replica().records(&users()), engine.master().records(&users()));
    }

    #[test]
    fn never_downgrades_replica() {
        let engine = engine(&[(1, 3)], &[(1, 9)]);
        let report = engine.resync(&users(), 1.0, None, &[]).unwrap();

        assert_eq!(report.skipped_newer, 1);
        assert_eq!(report.writes(), 0);
        assert_eq!(
            engine.replica().get(&users(), &Key::from(1)).unwrap(),
            Some(user(1, 9))
        );
    }

    #[test]
    fn unversioned_records_compare_content() {
        let m = MemoryStore::new();
        let r = MemoryStore::new();
        let same = Record::new("users", 1).with_field("name", "ada");
        m.insert(&users(), &same).unwrap();
        r.insert(&users(), &same).unwrap();
        m.insert(&users(), &Record::new("users", 2).with_field("name", "grace"))
            .unwrap();
        r.insert(&users(), &Record::new("users", 2).with_field("name", "old"))
            .unwrap();

        let engine = ResyncEngine::new(Arc::new(m), Arc::new(r), ResyncConfig::default());
        let report = engine.resync(&users(), 1.0, None, &[]).unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(
            engine.replica().records(&users()),
            engine.master().records(&users())
        );
    }

    #[test]
    fn rejects_invalid_speed() {
        let engine = engine(&[], &[]);
        for speed in [0.0, -1.0, 1.01, f64::NAN, f64::INFINITY] {
            let err = engine.resync(&users(), speed, None, &[]).unwrap_err();
            assert!(matches!(err, ResyncError::InvalidRequest(_)));
        }
    }

    #[test]
    fn rejects_values_without_filter() {
        let engine = engine(&[], &[]);
        let err = engine
            .resync(&users(), 1.0, None, &[Value::from(1)])
            .unwrap_err();
        assert!(matches!(err, ResyncError::InvalidRequest(_)));
    }

    #[test]
    fn canceled_before_start() {
        let engine = engine(&[(1, 1)], &[]);
        let token = CancellationToken::new();
        token.cancel();

        let err = engine
            .run(ResyncRequest::new(users()).with_cancellation(token))
            .unwrap_err();
        assert!(err.is_canceled());
        assert!(engine.replica().is_empty(&users()));
    }

    #[test]
    fn authoritative_type_fails_at_acquisition() {
        let engine = engine(&[(1, 1)], &[]);
        engine.replica().mark_unsupported("users");
        let ty = users().with_declaration(Declaration::Authoritative);

        let err = engine.resync(&ty, 1.0, None, &[]).unwrap_err();
        match err {
            ResyncError::Write { source, .. } => {
                assert_eq!(source.kind(), strata_core::WriteKind::UnsupportedType)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn independent_type_fails_on_first_access() {
        let engine = engine(&[(1, 1)], &[]);
        engine.master().mark_unsupported("users");

        let err = engine.resync(&users(), 1.0, None, &[]).unwrap_err();
        match err {
            ResyncError::Read { source, .. } => {
                assert_eq!(source.kind(), strata_core::ReadKind::UnsupportedType)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
