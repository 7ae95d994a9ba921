//! # Strata Testkit
//!
//! Test utilities for Strata.
//!
//! This crate provides:
//! - Property-based test generators using proptest
//! - Store fixtures and snapshot files in temporary directories
//! - Instrumented store wrappers that count writes or inject failures
//!
//! ## Usage
//!
//! ```rust
//! use strata_testkit::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let master = BTreeMap::from([(1, 1), (2, 3)]);
//! let (master, replica) = store_pair(&users_type(), &master, &BTreeMap::new());
//! assert_eq!(master.len(&users_type()), 2);
//! assert!(replica.is_empty(&users_type()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stores;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stores::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stores::*;
