//! Error types for the resync engine.

use strata_core::{FilterError, Key, ReadError, WriteError};
use thiserror::Error;

/// Result type for resync operations.
pub type ResyncResult<T> = Result<T, ResyncError>;

fn after(last_key: &Option<Key>) -> String {
    last_key
        .as_ref()
        .map(|k| format!(" after key {k}"))
        .unwrap_or_default()
}

/// Errors that can end a resync pass.
///
/// Store failures keep their read or write classification and carry the
/// record type and the last key that was fully reconciled, so a caller can
/// resume with a narrower filter.
#[derive(Error, Debug)]
pub enum ResyncError {
    /// The request was rejected before any store was touched.
    #[error("invalid resync request: {0}")]
    InvalidRequest(String),

    /// Reading from the master or replica failed, or the pass was canceled.
    #[error("resync of '{record_type}' failed{}: {source}", after(.last_key))]
    Read {
        /// Record type being resynchronized.
        record_type: String,
        /// Last key fully reconciled.
        last_key: Option<Key>,
        /// Underlying failure.
        #[source]
        source: ReadError,
    },

    /// Writing to the replica failed.
    #[error("resync of '{record_type}' failed{}: {source}", after(.last_key))]
    Write {
        /// Record type being resynchronized.
        record_type: String,
        /// Last key fully reconciled.
        last_key: Option<Key>,
        /// Underlying failure.
        #[source]
        source: WriteError,
    },
}

impl ResyncError {
    /// Returns true if the pass stopped because of cancellation.
    pub fn is_canceled(&self) -> bool {
        match self {
            ResyncError::Read { source, .. } => source.is_canceled(),
            ResyncError::Write { source, .. } => source.is_canceled(),
            ResyncError::InvalidRequest(_) => false,
        }
    }

    /// Record type of the failed pass.
    pub fn record_type(&self) -> Option<&str> {
        match self {
            ResyncError::Read { record_type, .. } | ResyncError::Write { record_type, .. } => {
                Some(record_type)
            }
            ResyncError::InvalidRequest(_) => None,
        }
    }

    /// Last key fully reconciled before the failure.
    pub fn last_key(&self) -> Option<&Key> {
        match self {
            ResyncError::Read { last_key, .. } | ResyncError::Write { last_key, .. } => {
                last_key.as_ref()
            }
            ResyncError::InvalidRequest(_) => None,
        }
    }

    /// Converts into a read-family failure.
    pub fn into_read_error(self) -> ReadError {
        match self {
            ResyncError::Read { source, .. } => source,
            ResyncError::Write { source, .. } => source.into_read(),
            ResyncError::InvalidRequest(message) => ReadError::fetch(message),
        }
    }

    /// Converts into a write-family failure.
    pub fn into_write_error(self) -> WriteError {
        match self {
            ResyncError::Read { source, .. } => source.into_write(),
            ResyncError::Write { source, .. } => source,
            ResyncError::InvalidRequest(message) => WriteError::persist(message),
        }
    }
}

impl From<FilterError> for ResyncError {
    fn from(err: FilterError) -> Self {
        ResyncError::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ReadKind, WriteKind};

    #[test]
    fn canceled_detection() {
        let err = ResyncError::Read {
            record_type: "users".into(),
            last_key: None,
            source: ReadError::canceled("stop"),
        };
        assert!(err.is_canceled());

        let err = ResyncError::Write {
            record_type: "users".into(),
            last_key: None,
            source: WriteError::persist("disk full"),
        };
        assert!(!err.is_canceled());
        assert!(!ResyncError::InvalidRequest("bad".into()).is_canceled());
    }

    #[test]
    fn error_display_includes_context() {
        let err = ResyncError::Write {
            record_type: "users".into(),
            last_key: Some(Key::from(41)),
            source: WriteError::no_rows_affected("gone"),
        };
        assert_eq!(
            err.to_string(),
            "resync of 'users' failed after key [41]: no rows affected: gone"
        );
        assert_eq!(err.record_type(), Some("users"));
        assert_eq!(err.last_key(), Some(&Key::from(41)));
    }

    #[test]
    fn taxonomy_conversion() {
        let err = ResyncError::Write {
            record_type: "users".into(),
            last_key: None,
            source: WriteError::canceled("stop"),
        };
        assert_eq!(err.into_read_error().kind(), ReadKind::Canceled);

        let err = ResyncError::Read {
            record_type: "users".into(),
            last_key: None,
            source: ReadError::not_found("x"),
        };
        assert_eq!(err.into_write_error().kind(), WriteKind::NoRowsAffected);
    }

    #[test]
    fn filter_errors_are_invalid_requests() {
        let err: ResyncError = FilterError::ParameterCount {
            placeholders: 1,
            values: 0,
        }
        .into();
        assert!(matches!(err, ResyncError::InvalidRequest(_)));
    }
}
