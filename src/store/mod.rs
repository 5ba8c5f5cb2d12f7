//! Persistence layer — SQLite-backed response log.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlResponseStore;
pub use traits::{NewResponseRecord, ResponseRecord, ResponseStore, ResponseStream};
