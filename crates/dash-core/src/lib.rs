//! Shared building blocks for the ticket dashboard.
//!
//! Holds the in-memory table model, the classification rule tables used by
//! the cleaner, timestamp and number coercion, CLI settings, error types and
//! number formatting helpers.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{DashboardError, Result};
pub use models::{Cell, Filters, Granularity, LabelCount, Table, View};
