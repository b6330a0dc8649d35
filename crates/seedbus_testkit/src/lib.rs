//! # SeedBus Testkit
//!
//! Test utilities for SeedBus.
//!
//! This crate provides:
//! - The conference fixture schema on in-memory and SQLite stores
//! - Property-based test generators using proptest
//! - A scenario harness that checks reset restores the baseline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use seedbus_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_conference() {
//!     with_each_store(|t| {
//!         t.insert_from_table("attendee", &table(&[&["Name"], &["Ann"]]), true)
//!             .unwrap();
//!         // ... assertions against t.store
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
