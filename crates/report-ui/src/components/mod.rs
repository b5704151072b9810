//! Reusable line-oriented widgets shared by the report views.

pub mod controls;
pub mod header;

pub use controls::{MetricSelector, TypeLegend};
pub use header::Header;
