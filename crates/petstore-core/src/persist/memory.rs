//! In-memory transactional backend
//!
//! Behaves like the relational store for the purposes of the coordinator:
//! generated keys, foreign keys, unique constraints, and a transaction that
//! either lands every staged row or none of them. Every call is appended to
//! a write log so callers can assert on ordering.

use std::collections::BTreeMap;

use crate::errors::{PetStoreError, Result};
use crate::mapping::tables::all_tables;
use crate::mapping::{KeyKind, Row, SqlValue, TableDef};
use crate::model::EntityId;

use super::unit_of_work::{RowSource, UnitOfWork};

/// (table, column, referenced table)
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("store", "address_id", "address"),
    ("animal", "store_id", "store"),
    ("cat", "id", "animal"),
    ("fish", "id", "animal"),
    ("store_product", "store_id", "store"),
    ("store_product", "product_id", "product"),
];

/// (table, columns that are unique together)
const UNIQUE: &[(&str, &[&str])] = &[
    ("store", &["address_id"]),
    ("store_product", &["store_id", "product_id"]),
];

/// One call observed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteLog {
    Begin,
    Insert { table: &'static str, id: EntityId },
    Update { table: &'static str, id: EntityId },
    Delete { table: &'static str },
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<&'static str, Vec<Row>>,
    next_id: BTreeMap<&'static str, i64>,
}

fn backend(op: &str, message: impl Into<String>) -> PetStoreError {
    PetStoreError::Backend {
        op: op.to_string(),
        message: message.into(),
    }
}

/// Transactional row store held in memory
#[derive(Debug)]
pub struct MemoryDatabase {
    schema: Vec<TableDef>,
    committed: Tables,
    staged: Option<Tables>,
    log: Vec<WriteLog>,
    fail_inserts_into: Option<String>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            schema: all_tables(),
            committed: Tables::default(),
            staged: None,
            log: Vec::new(),
            fail_inserts_into: None,
        }
    }

    /// Reject every later insert into `table`
    pub fn fail_inserts_into(&mut self, table: impl Into<String>) {
        self.fail_inserts_into = Some(table.into());
    }

    pub fn clear_failure(&mut self) {
        self.fail_inserts_into = None;
    }

    /// Committed rows of `table`, in insertion order
    pub fn rows(&self, table: &str) -> &[Row] {
        self.committed.rows.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    pub fn log(&self) -> &[WriteLog] {
        &self.log
    }

    /// Tables of inserts in the order they were issued
    pub fn insert_order(&self) -> Vec<&'static str> {
        self.log
            .iter()
            .filter_map(|entry| match entry {
                WriteLog::Insert { table, .. } => Some(*table),
                _ => None,
            })
            .collect()
    }

    pub fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    /// Write rows directly, outside any transaction and without checks
    ///
    /// Used to seed stored states the coordinator would never produce.
    pub fn seed(&mut self, row: Row) {
        let entry = self.committed.next_id.entry(row.table).or_insert(0);
        if let Ok(id) = row.id() {
            *entry = (*entry).max(id.value());
        }
        self.committed.rows.entry(row.table).or_default().push(row);
    }

    fn table_def(&self, name: &str) -> Result<TableDef> {
        self.schema
            .iter()
            .find(|t| t.name == name)
            .copied()
            .ok_or_else(|| backend("insert", format!("no such table: {}", name)))
    }

    fn staged_mut(&mut self, op: &str) -> Result<&mut Tables> {
        self.staged
            .as_mut()
            .ok_or_else(|| backend(op, "no transaction is active"))
    }
}

/// Foreign key and unique checks for `row` about to be stored
///
/// `replacing` names the row an update overwrites; it does not clash with
/// itself.
fn check_constraints(tables: &Tables, op: &str, row: &Row, replacing: Option<EntityId>) -> Result<()> {
    for (table, column, target) in FOREIGN_KEYS.iter().filter(|(t, _, _)| *t == row.table) {
        let value = match row.get(column) {
            Ok(SqlValue::Integer(v)) => *v,
            _ => continue,
        };
        let exists = tables
            .rows
            .get(*target)
            .is_some_and(|rows| rows.iter().any(|r| r.integer("id").ok() == Some(value)));
        if !exists {
            return Err(backend(
                op,
                format!("FOREIGN KEY constraint failed: {}.{} = {}", table, column, value),
            ));
        }
    }

    for (table, columns) in UNIQUE.iter().filter(|(t, _)| *t == row.table) {
        let key: Vec<&SqlValue> = columns.iter().filter_map(|c| row.get(c).ok()).collect();
        if key.iter().any(|v| **v == SqlValue::Null) {
            continue;
        }
        let clash = tables.rows.get(*table).is_some_and(|rows| {
            rows.iter()
                .filter(|r| replacing.is_none() || r.id().ok() != replacing)
                .any(|r| {
                    let other: Vec<&SqlValue> = columns.iter().filter_map(|c| r.get(c).ok()).collect();
                    other == key
                })
        });
        if clash {
            return Err(backend(
                op,
                format!("UNIQUE constraint failed: {}.{}", table, columns.join(", ")),
            ));
        }
    }
    Ok(())
}

impl UnitOfWork for MemoryDatabase {
    fn begin(&mut self) -> Result<()> {
        if self.staged.is_some() {
            return Err(backend("begin", "cannot start a transaction within a transaction"));
        }
        self.staged = Some(self.committed.clone());
        self.log.push(WriteLog::Begin);
        Ok(())
    }

    fn insert(&mut self, row: &Row) -> Result<EntityId> {
        let def = self.table_def(row.table)?;
        if self.fail_inserts_into.as_deref() == Some(row.table) {
            return Err(backend("insert", format!("injected failure on table {}", row.table)));
        }
        let staged = self.staged_mut("insert")?;
        check_constraints(staged, "insert", row, None)?;

        let next = staged.next_id.entry(def.name).or_insert(0);
        let (id, stored) = match def.key {
            KeyKind::Generated => {
                *next += 1;
                let id = EntityId(*next);
                let mut stored = Row::new(def.name).with("id", id);
                stored.values.extend(row.values.iter().cloned());
                (id, stored)
            }
            KeyKind::Shared => {
                let id = row.id()?;
                let taken = staged
                    .rows
                    .get(def.name)
                    .is_some_and(|rows| rows.iter().any(|r| r.id().ok() == Some(id)));
                if taken {
                    return Err(backend(
                        "insert",
                        format!("UNIQUE constraint failed: {}.id", def.name),
                    ));
                }
                (id, row.clone())
            }
            KeyKind::Composite => {
                *next += 1;
                (EntityId(*next), row.clone())
            }
        };

        let ordered = def.columns.iter().fold(Row::new(def.name), |acc, &column| {
            let value = stored.get(column).cloned().unwrap_or(SqlValue::Null);
            acc.with(column, value)
        });
        staged.rows.entry(def.name).or_default().push(ordered);
        self.log.push(WriteLog::Insert {
            table: def.name,
            id,
        });
        Ok(id)
    }

    fn update(&mut self, table: &'static str, id: EntityId, columns: &[(&'static str, SqlValue)]) -> Result<()> {
        let staged = self.staged_mut("update")?;
        let position = staged
            .rows
            .get(table)
            .and_then(|rows| rows.iter().position(|r| r.id().ok() == Some(id)))
            .ok_or_else(|| backend("update", format!("no row {} in {}", id, table)))?;

        let mut updated = staged.rows[table][position].clone();
        for (column, value) in columns {
            match updated.values.iter_mut().find(|(name, _)| name == column) {
                Some((_, slot)) => *slot = value.clone(),
                None => return Err(backend("update", format!("no such column: {}.{}", table, column))),
            }
        }
        check_constraints(staged, "update", &updated, Some(id))?;

        if let Some(rows) = staged.rows.get_mut(table) {
            rows[position] = updated;
        }
        self.log.push(WriteLog::Update { table, id });
        Ok(())
    }

    fn delete(&mut self, row: &Row) -> Result<()> {
        let def = self.table_def(row.table)?;
        let staged = self.staged_mut("delete")?;
        let matches = |stored: &Row| {
            row.values
                .iter()
                .all(|(column, value)| stored.get(column).ok() == Some(value))
        };
        let position = staged
            .rows
            .get(def.name)
            .and_then(|rows| rows.iter().position(matches))
            .ok_or_else(|| backend("delete", format!("no matching row in {}", def.name)))?;

        if let Ok(id) = staged.rows[def.name][position].integer("id") {
            for (table, column, _) in FOREIGN_KEYS.iter().filter(|(_, _, t)| *t == def.name) {
                let referenced = staged
                    .rows
                    .get(*table)
                    .is_some_and(|rows| rows.iter().any(|r| r.integer(column).ok() == Some(id)));
                if referenced {
                    return Err(backend(
                        "delete",
                        format!("FOREIGN KEY constraint failed: {}.{} = {}", table, column, id),
                    ));
                }
            }
        }

        if let Some(rows) = staged.rows.get_mut(def.name) {
            rows.remove(position);
        }
        self.log.push(WriteLog::Delete { table: def.name });
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| backend("commit", "no transaction is active"))?;
        self.committed = staged;
        self.log.push(WriteLog::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.staged.take().is_none() {
            return Err(backend("rollback", "no transaction is active"));
        }
        self.log.push(WriteLog::Rollback);
        Ok(())
    }
}

impl RowSource for MemoryDatabase {
    fn fetch_all(&self, table: &TableDef) -> Result<Vec<Row>> {
        self.table_def(table.name)
            .map_err(|_| backend("fetch", format!("no such table: {}", table.name)))?;
        let tables = self.staged.as_ref().unwrap_or(&self.committed);
        Ok(tables.rows.get(table.name).cloned().unwrap_or_default())
    }
}
