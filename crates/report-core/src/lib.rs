//! Shared domain types for the membership renewal report.
//!
//! Holds the closed set of tracked membership types, the record and series
//! models, the error type, CLI settings, timezone handling and number
//! formatting used by the data and UI crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ReportError, Result};
