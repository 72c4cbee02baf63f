//! Mapping between entities and relational rows

pub mod hierarchy;
pub mod row;
pub mod tables;

pub use hierarchy::{decode_animal, variant_table, VARIANT_TABLES};
pub use row::{KeyKind, Row, SqlValue, TableDef};
