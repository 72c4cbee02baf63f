//! `UnitOfWork` and `RowSource` over a borrowed SQLite connection
//!
//! Statements are built from the static `TableDef` descriptors, so table
//! and column names never come from caller data.

use petstore_core::errors::{PetStoreError, Result};
use petstore_core::mapping::tables::all_tables;
use petstore_core::mapping::{KeyKind, Row, SqlValue, TableDef};
use petstore_core::model::EntityId;
use petstore_core::persist::{RowSource, UnitOfWork};
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::errors::backend_error;

pub struct SqliteUnitOfWork<'c> {
    conn: &'c Connection,
    schema: Vec<TableDef>,
    active: bool,
}

impl<'c> SqliteUnitOfWork<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            schema: all_tables(),
            active: false,
        }
    }

    fn table_def(&self, op: &str, name: &str) -> Result<TableDef> {
        self.schema
            .iter()
            .find(|t| t.name == name)
            .copied()
            .ok_or_else(|| PetStoreError::Backend {
                op: op.to_string(),
                message: format!("no such table: {}", name),
            })
    }

    fn require_active(&self, op: &str) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(PetStoreError::Backend {
                op: op.to_string(),
                message: "no transaction is active".to_string(),
            })
        }
    }
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(*v),
        SqlValue::Text(v) => Value::Text(v.clone()),
    }
}

fn from_value(table: &str, column: &str, value: Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(v) => Ok(SqlValue::Integer(v)),
        Value::Real(v) => Ok(SqlValue::Real(v)),
        Value::Text(v) => Ok(SqlValue::Text(v)),
        Value::Blob(_) => Err(PetStoreError::InvalidColumn {
            table: table.to_string(),
            column: column.to_string(),
            reason: "unexpected blob value".to_string(),
        }),
    }
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn begin(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| backend_error("begin", e))?;
        self.active = true;
        Ok(())
    }

    fn insert(&mut self, row: &Row) -> Result<EntityId> {
        self.require_active("insert")?;
        let def = self.table_def("insert", row.table)?;
        let columns = def.insert_columns();
        let values = columns
            .iter()
            .map(|column| row.get(column).map(to_value))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            def.name,
            quoted(columns),
            placeholders(columns.len())
        );
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| backend_error("insert", e))?;

        match def.key {
            KeyKind::Shared => row.id(),
            KeyKind::Generated | KeyKind::Composite => Ok(EntityId(self.conn.last_insert_rowid())),
        }
    }

    fn update(&mut self, table: &'static str, id: EntityId, columns: &[(&'static str, SqlValue)]) -> Result<()> {
        self.require_active("update")?;
        let def = self.table_def("update", table)?;
        if let Some((column, _)) = columns.iter().find(|(c, _)| !def.columns.contains(c)) {
            return Err(PetStoreError::Backend {
                op: "update".to_string(),
                message: format!("no such column: {}.{}", table, column),
            });
        }

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            def.name,
            assignments,
            columns.len() + 1
        );
        let mut values: Vec<Value> = columns.iter().map(|(_, v)| to_value(v)).collect();
        values.push(Value::Integer(id.value()));

        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| backend_error("update", e))?;
        if changed != 1 {
            return Err(PetStoreError::Backend {
                op: "update".to_string(),
                message: format!("no row {} in {}", id, table),
            });
        }
        Ok(())
    }

    fn delete(&mut self, row: &Row) -> Result<()> {
        self.require_active("delete")?;
        let def = self.table_def("delete", row.table)?;
        if row.values.is_empty() {
            return Err(PetStoreError::Backend {
                op: "delete".to_string(),
                message: format!("no key columns given for {}", def.name),
            });
        }
        if let Some((column, _)) = row.values.iter().find(|(c, _)| !def.columns.contains(c)) {
            return Err(PetStoreError::Backend {
                op: "delete".to_string(),
                message: format!("no such column: {}.{}", def.name, column),
            });
        }

        let conditions = row
            .values
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!("DELETE FROM {} WHERE {}", def.name, conditions);
        let values: Vec<Value> = row.values.iter().map(|(_, v)| to_value(v)).collect();

        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| backend_error("delete", e))?;
        if changed != 1 {
            return Err(PetStoreError::Backend {
                op: "delete".to_string(),
                message: format!("{} rows matched in {}", changed, def.name),
            });
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.require_active("commit")?;
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| backend_error("commit", e))?;
        self.active = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.require_active("rollback")?;
        self.active = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| backend_error("rollback", e))
    }
}

impl RowSource for SqliteUnitOfWork<'_> {
    fn fetch_all(&self, table: &TableDef) -> Result<Vec<Row>> {
        let def = self.table_def("fetch", table.name)?;
        let sql = format!("SELECT {} FROM {} ORDER BY rowid", quoted(def.columns), def.name);
        let width = def.columns.len();

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| backend_error("fetch", e))?;
        let raw = stmt
            .query_map([], |r| {
                (0..width)
                    .map(|i| r.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| backend_error("fetch", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| backend_error("fetch", e))?;

        raw.into_iter()
            .map(|values| {
                def.columns
                    .iter()
                    .zip(values)
                    .try_fold(Row::new(def.name), |row, (&column, value)| -> Result<Row> {
                        Ok(row.with(column, from_value(def.name, column, value)?))
                    })
            })
            .collect()
    }
}

impl Drop for SqliteUnitOfWork<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "rollback on drop failed");
            }
        }
    }
}
