//! Migration runner
//!
//! Applies pending migrations in order, each in its own transaction.
//! Already-applied migrations are skipped after their checksum is verified.

#![allow(clippy::result_large_err)]

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{get_migrations, Migration};
use rusqlite::{Connection, OptionalExtension};

/// Apply all pending migrations to the database
///
/// Returns the ids of the migrations applied by this call.
///
/// # Errors
///
/// * `IntegrityViolation` - If an applied migration's recorded checksum
///   differs from the embedded SQL
/// * `Persistence` - If a migration's SQL fails; that migration is rolled back
pub fn apply_migrations(conn: &mut Connection) -> Result<Vec<&'static str>> {
    create_schema_version_table(conn)?;

    let mut applied = Vec::new();
    for migration in get_migrations() {
        if apply_migration(conn, &migration)? {
            tracing::info!(migration_id = migration.id, "migration applied");
            applied.push(migration.id);
        }
    }
    Ok(applied)
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
        [],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<bool> {
    let checksum = compute_checksum(migration.sql);

    let recorded: Option<String> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration.id, &recorded, &checksum));
        }
        return Ok(false);
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.id, now, checksum],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    Ok(true)
}
