//! Warehouse Monitor - browser dashboard over warehouse account-usage metadata
//!
//! A fixed menu of views (credit usage, long-running queries, spill, load,
//! cluster configuration, live activity) each maps to parameterized SQL.
//! Results are post-processed (unit conversion, derived ratios, renaming,
//! sorting) and rendered as HTML tables, with a JSON mirror for scripts.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
