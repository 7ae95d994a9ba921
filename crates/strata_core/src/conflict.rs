//! Optimistic-lock conflict detection.
//!
//! Detection is pure: the checks compare versions at the moment a versioned
//! write is about to commit and return a [`LockConflict`] describing the
//! mismatch. Nothing here retries; callers decide whether to re-read and
//! reapply.

use crate::error::Cause;
use crate::record::Record;
use crate::types::Version;
use std::error::Error as StdError;
use std::fmt;

/// Report of a lost update detected under optimistic concurrency control.
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct LockConflict {
    expected: Option<Version>,
    saved: Option<Version>,
    new_version: Option<Version>,
    record: Option<Record>,
    message: Option<String>,
    cause: Option<Cause>,
}

impl LockConflict {
    /// Conflict on the update path: the write expected `expected` but the
    /// store holds `saved`.
    #[must_use]
    pub fn on_update(
        expected: Option<Version>,
        saved: Option<Version>,
        record: Option<Record>,
    ) -> Self {
        let base = if expected.is_none() && saved.is_none() {
            None
        } else {
            Some(format!(
                "Update acted on version {}, but canonical version is {}",
                show(expected),
                show(saved)
            ))
        };
        Self {
            message: compose(base, record.as_ref()),
            expected,
            saved,
            new_version: None,
            record,
            cause: None,
        }
    }

    /// Conflict on the new-version path: `new_version` does not exceed the
    /// `saved` version.
    #[must_use]
    pub fn on_new_version(
        saved: Option<Version>,
        record: Option<Record>,
        new_version: Option<Version>,
    ) -> Self {
        let base = if new_version.is_none() && saved.is_none() {
            None
        } else {
            Some(format!(
                "New version of {} is not larger than existing version of {}",
                show(new_version),
                show(saved)
            ))
        };
        Self {
            message: compose(base, record.as_ref()),
            expected: None,
            saved,
            new_version,
            record,
            cause: None,
        }
    }

    /// Builds a conflict that only carries a message and cause.
    pub(crate) fn from_parts(message: Option<String>, cause: Option<Cause>) -> Self {
        Self {
            expected: None,
            saved: None,
            new_version: None,
            record: None,
            message,
            cause,
        }
    }

    /// Attaches a root cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Version the write expected to replace.
    #[must_use]
    pub fn expected(&self) -> Option<Version> {
        self.expected
    }

    /// Canonical version held by the store.
    #[must_use]
    pub fn saved(&self) -> Option<Version> {
        self.saved
    }

    /// Version the write tried to install, on the new-version path.
    #[must_use]
    pub fn new_version(&self) -> Option<Version> {
        self.new_version
    }

    /// The record the conflict occurred on, if it was supplied.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// The generated message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The root cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Option<Cause>) {
        (self.message, self.cause)
    }
}

impl fmt::Display for LockConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "optimistic lock conflict: {message}"),
            None => f.write_str("optimistic lock conflict"),
        }
    }
}

impl StdError for LockConflict {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|c| &**c as &(dyn StdError + 'static))
    }
}

fn show(version: Option<Version>) -> String {
    version.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn compose(base: Option<String>, record: Option<&Record>) -> Option<String> {
    match (base, record) {
        (Some(base), Some(record)) => Some(format!("{base}: {}", record.key_only_text())),
        (Some(base), None) => Some(base),
        (None, Some(record)) => Some(record.key_only_text()),
        (None, None) => None,
    }
}

/// Checks the update path: fails when the stored version differs from the
/// one the write read before attempting.
pub fn check_update(
    expected: Option<Version>,
    saved: Option<Version>,
    record: Option<&Record>,
) -> Result<(), LockConflict> {
    if expected == saved {
        Ok(())
    } else {
        Err(LockConflict::on_update(expected, saved, record.cloned()))
    }
}

/// Checks the new-version path: fails unless `new_version` is strictly
/// greater than `saved`.
///
/// Without a saved version any new version is acceptable. A missing new
/// version against a saved one is a conflict.
pub fn check_new_version(
    saved: Option<Version>,
    new_version: Option<Version>,
    record: Option<&Record>,
) -> Result<(), LockConflict> {
    match (saved, new_version) {
        (None, _) => Ok(()),
        (Some(saved), Some(new)) if new > saved => Ok(()),
        _ => Err(LockConflict::on_new_version(
            saved,
            record.cloned(),
            new_version,
        )),
    }
}

/// How a replica record's version relates to the master's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrder {
    /// Master holds a strictly greater version; the replica is stale.
    MasterNewer,
    /// Both hold the same version.
    Same,
    /// The replica is ahead of the master.
    ReplicaNewer,
    /// At least one side is unversioned; only content can decide.
    Unversioned,
}

/// Compares a replica record's version to the master's.
#[must_use]
pub fn compare_versions(replica: Option<Version>, master: Option<Version>) -> VersionOrder {
    match (replica, master) {
        (Some(replica), Some(master)) => match master.cmp(&replica) {
            std::cmp::Ordering::Greater => VersionOrder::MasterNewer,
            std::cmp::Ordering::Equal => VersionOrder::Same,
            std::cmp::Ordering::Less => VersionOrder::ReplicaNewer,
        },
        _ => VersionOrder::Unversioned,
    }
}
