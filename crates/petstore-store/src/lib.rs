//! SQLite persistence for the pet-store graph
//!
//! Provides:
//! - Connection management
//! - Embedded, checksummed schema migrations
//! - A `UnitOfWork` / `RowSource` backend over `rusqlite`
//! - `save_graph` / `load_graph` entry points for callers holding a connection

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::{load_graph, save_graph, SqliteUnitOfWork};
