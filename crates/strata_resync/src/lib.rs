//! # Strata Resync
//!
//! Master-to-replica repair for Strata record stores.
//!
//! This crate provides:
//! - A resync engine that walks master and replica in key order
//! - Throttling to a fraction of full speed
//! - Cooperative cancellation through a shared token
//! - Filter scoping of a pass to a subset of keys
//!
//! ## Key Invariants
//!
//! - The master is authoritative; only the replica is written
//! - A replica record is never moved back to an older version
//! - Passes are idempotent: a second pass over unchanged stores writes nothing
//! - No repair is started once cancellation has been observed
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_core::{MemoryStore, Record, RecordStore, RecordType, Version};
//! use strata_resync::{ResyncConfig, ResyncEngine};
//!
//! let users = RecordType::new("users", ["id"]);
//! let master = MemoryStore::new();
//! master
//!     .insert(&users, &Record::new("users", 1).with_version(Version::new(2)))
//!     .unwrap();
//!
//! let engine = ResyncEngine::new(
//!     Arc::new(master),
//!     Arc::new(MemoryStore::new()),
//!     ResyncConfig::default(),
//! );
//! let report = engine.resync(&users, 1.0, None, &[]).unwrap();
//! assert_eq!(report.inserted, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod merge;
mod throttle;

pub use config::ResyncConfig;
pub use engine::{ResyncEngine, ResyncReport, ResyncRequest};
pub use error::{ResyncError, ResyncResult};
pub use merge::{MergeCursor, MergeStep, Repair, Side};
pub use throttle::Throttle;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
