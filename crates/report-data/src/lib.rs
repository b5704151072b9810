//! Data layer for the membership report.
//!
//! Loads membership change records (HTTP export or local CSV), aggregates
//! them into cumulative per-type series and persists the JSON artifacts the
//! viewer reads.

pub mod aggregator;
pub mod artifacts;
pub mod fetcher;
pub mod pipeline;
pub mod reader;

pub use report_core as core;
