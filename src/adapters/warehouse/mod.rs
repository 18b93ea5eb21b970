//! Warehouse adapters that need no network.
//!
//! - `mock` - Canned results for tests and local development

mod mock;

pub use mock::{MockResponse, MockWarehouse};
