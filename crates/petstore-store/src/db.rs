//! Database connection management

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path, creating parent directories
///
/// # Errors
///
/// Returns an `Io` error if the parent directory cannot be created and a
/// `Persistence` error if SQLite cannot open the file.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| crate::errors::io_error("open", e))?;
    }
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
///
/// # Errors
///
/// Returns a `Persistence` error if SQLite refuses the connection.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Enforce foreign keys on this connection
///
/// # Errors
///
/// Returns a `Persistence` error if the pragma cannot be set.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(from_rusqlite)?;
    Ok(())
}
