//! Schema migration command

use std::path::Path;

use petstore_store::{db, migrations};

use super::CommandResult;

pub fn execute(db_path: &Path) -> CommandResult {
    let mut conn = db::open(db_path)?;
    let applied = migrations::apply_migrations(&mut conn)?;

    if applied.is_empty() {
        println!("Schema is up to date");
    } else {
        for id in &applied {
            println!("Applied {}", id);
        }
    }
    Ok(())
}
