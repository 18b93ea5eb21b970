//! Domain layer containing the dashboard's business logic and types.
//!
//! # Module Organization
//!
//! - `monitoring` - View registry, tabular results, derived fields and the
//!   page model produced by a render pass
pub mod monitoring;
