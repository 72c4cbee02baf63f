//! Schema migrations
//!
//! SQL files are embedded at compile time and recorded in `schema_version`
//! together with their SHA-256 checksum.

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::apply_migrations;
