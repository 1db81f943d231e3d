//! Data layer for the ticket dashboard.
//!
//! Reads helpdesk board exports (or the ConnectWise API), cleans them into
//! canonical typed columns, groups tickets by time period and builds the
//! summary views rendered by the dashboard, the text report and the CSV
//! export.

pub mod aggregator;
pub mod analysis;
pub mod cleaner;
pub mod connectwise;
pub mod export;
pub mod reader;
pub mod report;
pub mod summaries;

pub use dash_core as core;
