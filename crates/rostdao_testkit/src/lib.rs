//! # RostDAO Testkit
//!
//! Test utilities for RostDAO.
//!
//! This crate provides:
//! - Sample record types and per-backend DAO builders
//! - Property-based test generators using proptest
//! - A contract suite every backend must pass
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rostdao_testkit::prelude::*;
//!
//! #[test]
//! fn csv_backend_honours_contract() {
//!     run_contract(Backend::Csv);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::contract::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_test_tracing;
}

pub use contract::run_contract;
pub use fixtures::*;
pub use generators::*;

/// Installs a tracing subscriber for tests, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
