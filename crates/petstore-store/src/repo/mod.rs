//! Repository layer bridging the in-memory graph and SQLite

pub mod sqlite_uow;

pub use sqlite_uow::SqliteUnitOfWork;

use petstore_core::errors::Result;
use petstore_core::model::EntityRef;
use petstore_core::ops::Graph;
use petstore_core::persist::{self, CascadeReport};
use rusqlite::Connection;

/// Save everything reachable from `roots` in one SQLite transaction
///
/// # Errors
///
/// Propagates every error of `petstore_core::persist::persist`.
pub fn save_graph(conn: &Connection, graph: &mut Graph, roots: &[EntityRef]) -> Result<CascadeReport> {
    let mut uow = SqliteUnitOfWork::new(conn);
    persist::persist(graph, &mut uow, roots)
}

/// Rebuild the whole graph from the database
///
/// # Errors
///
/// Propagates every error of `petstore_core::persist::load_graph`.
pub fn load_graph(conn: &Connection) -> Result<Graph> {
    persist::load_graph(&SqliteUnitOfWork::new(conn))
}
