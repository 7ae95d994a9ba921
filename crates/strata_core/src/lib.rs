//! # Strata Core
//!
//! Consistency primitives shared by every Strata storage backend.
//!
//! This crate provides:
//! - The record model (values, keys, versions, record types)
//! - Read and write failure families with lossless conversion between them
//! - Optimistic-lock conflict detection
//! - Filter predicates with positional parameters
//! - The [`RecordStore`] contract and an in-memory reference store
//! - Cooperative cancellation
//!
//! ## Failure families
//!
//! Read paths fail with [`ReadError`], write paths with [`WriteError`].
//! Each kind knows its sibling kind, so a failure can cross from one path to
//! the other without losing its message or root cause:
//!
//! ```rust
//! use strata_core::{ReadError, ReadKind, WriteKind};
//!
//! let write = ReadError::not_found("no such user").into_write();
//! assert_eq!(write.kind(), WriteKind::NoRowsAffected);
//! assert_eq!(write.into_read().kind(), ReadKind::NotFound);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod conflict;
mod error;
mod filter;
mod memory;
mod record;
mod store;
mod types;

pub use cancel::CancellationToken;
pub use conflict::{check_new_version, check_update, compare_versions, LockConflict, VersionOrder};
pub use error::{Cause, ReadError, ReadKind, ReadResult, WriteError, WriteKind, WriteResult};
pub use filter::{CompareOp, Filter, FilterError, FilterResult};
pub use memory::{MemoryStore, StoreSnapshot, TypeSnapshot};
pub use record::{Declaration, Record, RecordType};
pub use store::{RecordCursor, RecordStore};
pub use types::{Key, Value, Version};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
