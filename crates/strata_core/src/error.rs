//! Read and write failure families.
//!
//! Every store operation fails with either a [`ReadError`] or a
//! [`WriteError`]. The two families mirror each other: each kind names the
//! kind it becomes in the sibling family ([`ReadKind::counterpart`],
//! [`WriteKind::counterpart`]) and conversion moves the message and root
//! cause across unchanged, so converting read → write → read yields the
//! original kind, message and the very same cause.

use crate::conflict::LockConflict;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared root cause of a failure.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Result type for read-path operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for write-path operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Renders an optional message as a `": message"` suffix.
fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Kinds of read-path failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKind {
    /// Zero records where one was required.
    NotFound,
    /// More than one record where at most one was expected.
    TooMany,
    /// The operation was aborted by external cancellation.
    Canceled,
    /// The backend cannot map the record type.
    UnsupportedType,
    /// Any other fetch failure.
    Fetch,
}

impl ReadKind {
    /// Returns the write kind this kind converts to.
    #[must_use]
    pub const fn counterpart(self) -> WriteKind {
        match self {
            ReadKind::NotFound => WriteKind::NoRowsAffected,
            ReadKind::TooMany => WriteKind::TooManyRowsAffected,
            ReadKind::Canceled => WriteKind::Canceled,
            ReadKind::UnsupportedType => WriteKind::UnsupportedType,
            ReadKind::Fetch => WriteKind::Persist,
        }
    }
}

/// Kinds of write-path failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// The write touched zero records where one was required.
    NoRowsAffected,
    /// The write touched more records than expected.
    TooManyRowsAffected,
    /// The operation was aborted by external cancellation.
    Canceled,
    /// An optimistic-lock version check failed.
    OptimisticLock,
    /// The backend cannot map the record type.
    UnsupportedType,
    /// Any other persist failure.
    Persist,
}

impl WriteKind {
    /// Returns the read kind this kind converts to.
    ///
    /// Lock conflicts have no read-side sibling and become a generic fetch
    /// failure.
    #[must_use]
    pub const fn counterpart(self) -> ReadKind {
        match self {
            WriteKind::NoRowsAffected => ReadKind::NotFound,
            WriteKind::TooManyRowsAffected => ReadKind::TooMany,
            WriteKind::Canceled => ReadKind::Canceled,
            WriteKind::OptimisticLock => ReadKind::Fetch,
            WriteKind::UnsupportedType => ReadKind::UnsupportedType,
            WriteKind::Persist => ReadKind::Fetch,
        }
    }
}

/// A read-path failure.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// Zero records where one was required.
    #[error("record not found{}", suffix(.message))]
    NotFound {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// More than one record where at most one was expected.
    #[error("too many results{}", suffix(.message))]
    TooMany {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// Aborted by external cancellation.
    #[error("read canceled{}", suffix(.message))]
    Canceled {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// The backend cannot map the record type.
    #[error("unsupported record type{}", suffix(.message))]
    UnsupportedType {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// Generic fetch failure.
    #[error("fetch failed{}", suffix(.message))]
    Fetch {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },
}

impl ReadError {
    /// Builds a read failure of `kind` from its parts.
    #[must_use]
    pub fn from_parts(kind: ReadKind, message: Option<String>, cause: Option<Cause>) -> Self {
        match kind {
            ReadKind::NotFound => ReadError::NotFound { message, cause },
            ReadKind::TooMany => ReadError::TooMany { message, cause },
            ReadKind::Canceled => ReadError::Canceled { message, cause },
            ReadKind::UnsupportedType => ReadError::UnsupportedType { message, cause },
            ReadKind::Fetch => ReadError::Fetch { message, cause },
        }
    }

    /// Creates a not-found failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_parts(ReadKind::NotFound, Some(message.into()), None)
    }

    /// Creates a too-many-results failure.
    pub fn too_many(message: impl Into<String>) -> Self {
        Self::from_parts(ReadKind::TooMany, Some(message.into()), None)
    }

    /// Creates a canceled failure.
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::from_parts(ReadKind::Canceled, Some(message.into()), None)
    }

    /// Creates an unsupported-type failure.
    pub fn unsupported_type(type_name: &str) -> Self {
        Self::from_parts(
            ReadKind::UnsupportedType,
            Some(format!("record type '{type_name}' is not supported by this store")),
            None,
        )
    }

    /// Creates a generic fetch failure.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::from_parts(ReadKind::Fetch, Some(message.into()), None)
    }

    /// Creates a generic fetch failure caused by `cause`.
    pub fn fetch_caused_by(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::from_parts(ReadKind::Fetch, Some(message.into()), Some(cause.into()))
    }

    /// Adopts an arbitrary error as a read failure.
    ///
    /// A read failure is returned as is and a write failure is converted to
    /// its counterpart; anything else becomes a [`ReadError::Fetch`] caused
    /// by the error.
    pub fn wrap(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        let err = match err.downcast::<ReadError>() {
            Ok(read) => return *read,
            Err(other) => other,
        };
        match err.downcast::<WriteError>() {
            Ok(write) => write.into_read(),
            Err(other) => {
                let message = other.to_string();
                Self::from_parts(ReadKind::Fetch, Some(message), Some(Cause::from(other)))
            }
        }
    }

    /// Returns the kind of this failure.
    #[must_use]
    pub fn kind(&self) -> ReadKind {
        match self {
            ReadError::NotFound { .. } => ReadKind::NotFound,
            ReadError::TooMany { .. } => ReadKind::TooMany,
            ReadError::Canceled { .. } => ReadKind::Canceled,
            ReadError::UnsupportedType { .. } => ReadKind::UnsupportedType,
            ReadError::Fetch { .. } => ReadKind::Fetch,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.parts().0.as_deref()
    }

    /// Returns the root cause.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.parts().1.as_ref()
    }

    /// Returns true if the operation was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.kind() == ReadKind::Canceled
    }

    /// Converts into the equivalent write failure.
    #[must_use]
    pub fn into_write(self) -> WriteError {
        let kind = self.kind().counterpart();
        let (message, cause) = self.into_parts();
        WriteError::from_parts(kind, message, cause)
    }

    fn parts(&self) -> (&Option<String>, &Option<Cause>) {
        match self {
            ReadError::NotFound { message, cause }
            | ReadError::TooMany { message, cause }
            | ReadError::Canceled { message, cause }
            | ReadError::UnsupportedType { message, cause }
            | ReadError::Fetch { message, cause } => (message, cause),
        }
    }

    /// Splits the failure into message and cause.
    #[must_use]
    pub fn into_parts(self) -> (Option<String>, Option<Cause>) {
        match self {
            ReadError::NotFound { message, cause }
            | ReadError::TooMany { message, cause }
            | ReadError::Canceled { message, cause }
            | ReadError::UnsupportedType { message, cause }
            | ReadError::Fetch { message, cause } => (message, cause),
        }
    }
}

/// A write-path failure.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The write touched zero records where one was required.
    #[error("no rows affected{}", suffix(.message))]
    NoRowsAffected {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// The write touched more records than expected.
    #[error("too many rows affected{}", suffix(.message))]
    TooManyRowsAffected {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// Aborted by external cancellation.
    #[error("write canceled{}", suffix(.message))]
    Canceled {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// A versioned write lost an optimistic-lock race.
    #[error(transparent)]
    OptimisticLock(Box<LockConflict>),

    /// The backend cannot map the record type.
    #[error("unsupported record type{}", suffix(.message))]
    UnsupportedType {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },

    /// Generic persist failure.
    #[error("persist failed{}", suffix(.message))]
    Persist {
        /// Human-readable message.
        message: Option<String>,
        /// Root cause.
        #[source]
        cause: Option<Cause>,
    },
}

impl WriteError {
    /// Builds a write failure of `kind` from its parts.
    ///
    /// An [`WriteKind::OptimisticLock`] built this way carries no versions,
    /// only the message and cause.
    #[must_use]
    pub fn from_parts(kind: WriteKind, message: Option<String>, cause: Option<Cause>) -> Self {
        match kind {
            WriteKind::NoRowsAffected => WriteError::NoRowsAffected { message, cause },
            WriteKind::TooManyRowsAffected => WriteError::TooManyRowsAffected { message, cause },
            WriteKind::Canceled => WriteError::Canceled { message, cause },
            WriteKind::OptimisticLock => {
                WriteError::OptimisticLock(Box::new(LockConflict::from_parts(message, cause)))
            }
            WriteKind::UnsupportedType => WriteError::UnsupportedType { message, cause },
            WriteKind::Persist => WriteError::Persist { message, cause },
        }
    }

    /// Creates a no-rows-affected failure.
    pub fn no_rows_affected(message: impl Into<String>) -> Self {
        Self::from_parts(WriteKind::NoRowsAffected, Some(message.into()), None)
    }

    /// Creates a too-many-rows-affected failure.
    pub fn too_many_rows_affected(message: impl Into<String>) -> Self {
        Self::from_parts(WriteKind::TooManyRowsAffected, Some(message.into()), None)
    }

    /// Creates a canceled failure.
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::from_parts(WriteKind::Canceled, Some(message.into()), None)
    }

    /// Creates an unsupported-type failure.
    pub fn unsupported_type(type_name: &str) -> Self {
        Self::from_parts(
            WriteKind::UnsupportedType,
            Some(format!("record type '{type_name}' is not supported by this store")),
            None,
        )
    }

    /// Creates a generic persist failure.
    pub fn persist(message: impl Into<String>) -> Self {
        Self::from_parts(WriteKind::Persist, Some(message.into()), None)
    }

    /// Creates a generic persist failure caused by `cause`.
    pub fn persist_caused_by(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::from_parts(WriteKind::Persist, Some(message.into()), Some(cause.into()))
    }

    /// Adopts an arbitrary error as a write failure.
    ///
    /// A write failure is returned as is and a read failure is converted to
    /// its counterpart; anything else becomes a [`WriteError::Persist`]
    /// caused by the error.
    pub fn wrap(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        let err = match err.downcast::<WriteError>() {
            Ok(write) => return *write,
            Err(other) => other,
        };
        match err.downcast::<ReadError>() {
            Ok(read) => read.into_write(),
            Err(other) => {
                let message = other.to_string();
                Self::from_parts(WriteKind::Persist, Some(message), Some(Cause::from(other)))
            }
        }
    }

    /// Returns the kind of this failure.
    #[must_use]
    pub fn kind(&self) -> WriteKind {
        match self {
            WriteError::NoRowsAffected { .. } => WriteKind::NoRowsAffected,
            WriteError::TooManyRowsAffected { .. } => WriteKind::TooManyRowsAffected,
            WriteError::Canceled { .. } => WriteKind::Canceled,
            WriteError::OptimisticLock(_) => WriteKind::OptimisticLock,
            WriteError::UnsupportedType { .. } => WriteKind::UnsupportedType,
            WriteError::Persist { .. } => WriteKind::Persist,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            WriteError::OptimisticLock(conflict) => conflict.message(),
            WriteError::NoRowsAffected { message, .. }
            | WriteError::TooManyRowsAffected { message, .. }
            | WriteError::Canceled { message, .. }
            | WriteError::UnsupportedType { message, .. }
            | WriteError::Persist { message, .. } => message.as_deref(),
        }
    }

    /// Returns the root cause.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            WriteError::OptimisticLock(conflict) => LockConflict::cause(conflict),
            WriteError::NoRowsAffected { cause, .. }
            | WriteError::TooManyRowsAffected { cause, .. }
            | WriteError::Canceled { cause, .. }
            | WriteError::UnsupportedType { cause, .. }
            | WriteError::Persist { cause, .. } => cause.as_ref(),
        }
    }

    /// Returns the conflict report if this is a lock conflict.
    #[must_use]
    pub fn lock_conflict(&self) -> Option<&LockConflict> {
        match self {
            WriteError::OptimisticLock(conflict) => Some(&**conflict),
            _ => None,
        }
    }

    /// Returns true if the operation was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.kind() == WriteKind::Canceled
    }

    /// Converts into the equivalent read failure.
    #[must_use]
    pub fn into_read(self) -> ReadError {
        let kind = self.kind().counterpart();
        let (message, cause) = self.into_parts();
        ReadError::from_parts(kind, message, cause)
    }

    /// Splits the failure into message and cause.
    #[must_use]
    pub fn into_parts(self) -> (Option<String>, Option<Cause>) {
        match self {
            WriteError::OptimisticLock(conflict) => (*conflict).into_parts(),
            WriteError::NoRowsAffected { message, cause }
            | WriteError::TooManyRowsAffected { message, cause }
            | WriteError::Canceled { message, cause }
            | WriteError::UnsupportedType { message, cause }
            | WriteError::Persist { message, cause } => (message, cause),
        }
    }
}

impl From<ReadError> for WriteError {
    fn from(err: ReadError) -> Self {
        err.into_write()
    }
}

impl From<WriteError> for ReadError {
    fn from(err: WriteError) -> Self {
        err.into_read()
    }
}

impl From<LockConflict> for WriteError {
    fn from(conflict: LockConflict) -> Self {
        WriteError::OptimisticLock(Box::new(conflict))
    }
}

impl fmt::Display for ReadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadKind::NotFound => "not-found",
            ReadKind::TooMany => "too-many",
            ReadKind::Canceled => "canceled",
            ReadKind::UnsupportedType => "unsupported-type",
            ReadKind::Fetch => "fetch",
        };
        f.write_str(name)
    }
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteKind::NoRowsAffected => "no-rows-affected",
            WriteKind::TooManyRowsAffected => "too-many-rows-affected",
            WriteKind::Canceled => "canceled",
            WriteKind::OptimisticLock => "optimistic-lock",
            WriteKind::UnsupportedType => "unsupported-type",
            WriteKind::Persist => "persist",
        };
        f.write_str(name)
    }
}
