//! CLI command implementations.

pub mod diff;
pub mod inspect;
pub mod resync;
pub mod snapshot;
