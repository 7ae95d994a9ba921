//! Key-ordered merge of master and replica scans.

use std::cmp::Ordering;
use strata_core::{
    compare_versions, Key, ReadError, ReadResult, Record, RecordCursor, RecordStore, RecordType,
    VersionOrder,
};

/// Which store a failed read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The authoritative store.
    Master,
    /// The store being repaired.
    Replica,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Master => f.write_str("master"),
            Side::Replica => f.write_str("replica"),
        }
    }
}

/// One step of the merge: a key present on one or both sides.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeStep {
    /// Key only exists on the master.
    MasterOnly(Record),
    /// Key only exists on the replica.
    ReplicaOnly(Record),
    /// Key exists on both sides.
    Both {
        /// Master copy.
        master: Record,
        /// Replica copy.
        replica: Record,
    },
}

impl MergeStep {
    /// The key this step is about.
    pub fn key(&self) -> &Key {
        match self {
            MergeStep::MasterOnly(r) | MergeStep::ReplicaOnly(r) => &r.key,
            MergeStep::Both { master, .. } => &master.key,
        }
    }

    /// The master copy, if the master has the key.
    pub fn master(&self) -> Option<&Record> {
        match self {
            MergeStep::MasterOnly(master) | MergeStep::Both { master, .. } => Some(master),
            MergeStep::ReplicaOnly(_) => None,
        }
    }

    /// The replica copy, if the replica has the key.
    pub fn replica(&self) -> Option<&Record> {
        match self {
            MergeStep::ReplicaOnly(replica) | MergeStep::Both { replica, .. } => Some(replica),
            MergeStep::MasterOnly(_) => None,
        }
    }

    /// Fetches the missing side of a one-sided step by key.
    ///
    /// A filtered scan hides records that fail the filter, so a key can look
    /// one-sided while the other store still holds it under different field
    /// values. Steps that are already two-sided are returned as is.
    pub fn complete<M, R>(
        self,
        record_type: &RecordType,
        master: &M,
        replica: &R,
    ) -> Result<Self, (Side, ReadError)>
    where
        M: RecordStore + ?Sized,
        R: RecordStore + ?Sized,
    {
        match self {
            MergeStep::MasterOnly(master_copy) => {
                let found = replica
                    .get(record_type, &master_copy.key)
                    .map_err(|e| (Side::Replica, e))?;
                Ok(match found {
                    Some(replica) => MergeStep::Both {
                        master: master_copy,
                        replica,
                    },
                    None => MergeStep::MasterOnly(master_copy),
                })
            }
            MergeStep::ReplicaOnly(replica_copy) => {
                let found = master
                    .get(record_type, &replica_copy.key)
                    .map_err(|e| (Side::Master, e))?;
                Ok(match found {
                    Some(master) => MergeStep::Both {
                        master,
                        replica: replica_copy,
                    },
                    None => MergeStep::ReplicaOnly(replica_copy),
                })
            }
            both @ MergeStep::Both { .. } => Ok(both),
        }
    }

    /// Decides what the replica needs for this key.
    ///
    /// The replica is never moved back to an older version. Unversioned
    /// records are overwritten only when their content differs.
    pub fn repair(&self) -> Repair<'_> {
        match self {
            MergeStep::MasterOnly(master) => Repair::Insert(master),
            MergeStep::ReplicaOnly(replica) => Repair::Delete(&replica.key),
            MergeStep::Both { master, replica } => {
                match compare_versions(replica.version, master.version) {
                    VersionOrder::MasterNewer => Repair::Update(master),
                    VersionOrder::Same => Repair::Keep,
                    VersionOrder::ReplicaNewer => Repair::SkipNewer,
                    VersionOrder::Unversioned if master != replica => Repair::Update(master),
                    VersionOrder::Unversioned => Repair::Keep,
                }
            }
        }
    }
}

/// The replica write a merge step calls for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repair<'a> {
    /// Copy the master record into the replica.
    Insert(&'a Record),
    /// Overwrite the replica record with the master copy.
    Update(&'a Record),
    /// Remove the key from the replica.
    Delete(&'a Key),
    /// Already in sync.
    Keep,
    /// The replica is ahead of the master; leave it alone.
    SkipNewer,
}

/// One side of the merge with a single record of lookahead.
struct Lane<'a> {
    side: Side,
    cursor: RecordCursor<'a>,
    head: Option<Record>,
    last: Option<Key>,
    check_order: bool,
}

impl<'a> Lane<'a> {
    fn new(side: Side, cursor: RecordCursor<'a>, check_order: bool) -> Self {
        Self {
            side,
            cursor,
            head: None,
            last: None,
            check_order,
        }
    }

    /// Makes sure `head` holds the next record, if there is one.
    fn fill(&mut self) -> ReadResult<()> {
        if self.head.is_some() {
            return Ok(());
        }
        let Some(next) = self.cursor.next() else {
            return Ok(());
        };
        let record = next?;
        if self.check_order {
            if let Some(last) = &self.last {
                if record.key <= *last {
                    return Err(ReadError::fetch(format!(
                        "{} scan out of key order: {} after {}",
                        self.side, record.key, last
                    )));
                }
            }
        }
        self.last = Some(record.key.clone());
        self.head = Some(record);
        Ok(())
    }
}

/// Merges two key-ordered scans without materializing either.
///
/// Holds at most one record from each side at a time.
pub struct MergeCursor<'a> {
    master: Lane<'a>,
    replica: Lane<'a>,
}

impl<'a> MergeCursor<'a> {
    /// Creates a merge over a master and a replica scan.
    pub fn new(master: RecordCursor<'a>, replica: RecordCursor<'a>, check_order: bool) -> Self {
        Self {
            master: Lane::new(Side::Master, master, check_order),
            replica: Lane::new(Side::Replica, replica, check_order),
        }
    }

    /// Returns the next step, or `None` once both scans are exhausted.
    ///
    /// Errors are tagged with the side that produced them.
    pub fn next_step(&mut self) -> Result<Option<MergeStep>, (Side, ReadError)> {
        self.master.fill().map_err(|e| (Side::Master, e))?;
        self.replica.fill().map_err(|e| (Side::Replica, e))?;

        let order = match (&self.master.head, &self.replica.head) {
            (None, None) => return Ok(None),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(m), Some(r)) => m.key.cmp(&r.key),
        };

        let step = match order {
            Ordering::Less => self.master.head.take().map(MergeStep::MasterOnly),
            Ordering::Greater => self.replica.head.take().map(MergeStep::ReplicaOnly),
            Ordering::Equal => match (self.master.head.take(), self.replica.head.take()) {
                (Some(master), Some(replica)) => Some(MergeStep::Both { master, replica }),
                _ => None,
            },
        };
        Ok(step)
    }
}
