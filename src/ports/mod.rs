//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `WarehouseConnection` / `CommandCursor` - Read-only warehouse access
//! - `PageRenderer` - Browser rendering of a dashboard page

mod page_renderer;
mod warehouse;

pub use page_renderer::PageRenderer;
pub use warehouse::{
    AuthError, ColumnDescriptor, CommandCursor, ConnectionError, CredentialError, Statement,
    WarehouseConnection, WarehouseError,
};
