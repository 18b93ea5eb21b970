//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routes and the HTML page renderer
//! - `snowflake` - key-pair credential and SQL API client
//! - `warehouse` - in-process mock warehouse for tests and demos

pub mod http;
pub mod snowflake;
pub mod warehouse;

pub use snowflake::{obtain_connection, KeyPairCredential, SnowflakeConnection};
pub use warehouse::MockWarehouse;
