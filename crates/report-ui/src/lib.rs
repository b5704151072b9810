//! Terminal UI layer for the membership report.
//!
//! Provides themes, header and control components, the cumulative series
//! chart and the interactive viewer event loop built on top of [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod state;
pub mod themes;

pub use report_core as core;
