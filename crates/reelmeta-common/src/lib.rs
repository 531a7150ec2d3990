//! Shared types for the reelmeta metadata pipeline.
//!
//! This crate holds the pieces every other reelmeta crate agrees on: the
//! [`Record`] data model produced by all source parsers, the closed rating
//! tables, and the common error type.

pub mod error;
pub mod ratings;
pub mod record;

pub use error::{Error, Result};
pub use record::{Record, Value};
