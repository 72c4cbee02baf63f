//! Backend-neutral rows and table descriptors

use chrono::NaiveDate;

use crate::errors::{PetStoreError, Result};
use crate::model::EntityId;

/// Storage format of date columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Integer(_) => "integer",
            SqlValue::Real(_) => "real",
            SqlValue::Text(_) => "text",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<EntityId> for SqlValue {
    fn from(v: EntityId) -> Self {
        SqlValue::Integer(v.value())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Text(v.format(DATE_FORMAT).to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// How a table's primary key is produced on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Issued by the backend; the row carries no `id` value
    Generated,
    /// Copied from the base row; the row carries its `id`
    Shared,
    /// Composite of the row's own columns, no surrogate key
    Composite,
}

/// Static description of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub key: KeyKind,
    /// All columns in declaration order, key columns first
    pub columns: &'static [&'static str],
}

impl TableDef {
    /// Columns an insert supplies
    pub fn insert_columns(&self) -> &'static [&'static str] {
        match self.key {
            KeyKind::Generated => &self.columns[1..],
            KeyKind::Shared | KeyKind::Composite => self.columns,
        }
    }
}

/// One row bound for, or read from, a table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: &'static str,
    pub values: Vec<(&'static str, SqlValue)>,
}

impl Row {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    fn column_error(&self, column: &str, reason: impl Into<String>) -> PetStoreError {
        PetStoreError::InvalidColumn {
            table: self.table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| self.column_error(column, "missing"))
    }

    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent or not an integer.
    pub fn integer(&self, column: &str) -> Result<i64> {
        match self.get(column)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(self.column_error(column, format!("expected integer, found {}", other.type_name()))),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent or neither null nor an integer.
    pub fn opt_integer(&self, column: &str) -> Result<Option<i64>> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(*v)),
            other => Err(self.column_error(column, format!("expected integer or null, found {}", other.type_name()))),
        }
    }

    /// Integers widen to reals.
    ///
    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent or not numeric.
    pub fn real(&self, column: &str) -> Result<f64> {
        match self.get(column)? {
            SqlValue::Real(v) => Ok(*v),
            SqlValue::Integer(v) => Ok(*v as f64),
            other => Err(self.column_error(column, format!("expected real, found {}", other.type_name()))),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent or not text.
    pub fn text(&self, column: &str) -> Result<&str> {
        match self.get(column)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(self.column_error(column, format!("expected text, found {}", other.type_name()))),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidColumn` if the column is absent or not an ISO-8601 date.
    pub fn date(&self, column: &str) -> Result<NaiveDate> {
        let raw = self.text(column)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| self.column_error(column, format!("invalid date '{}': {}", raw, e)))
    }

    /// Surrogate key of the row
    ///
    /// # Errors
    ///
    /// Returns `InvalidColumn` if `id` is absent or not an integer.
    pub fn id(&self) -> Result<EntityId> {
        self.integer("id").map(EntityId)
    }
}
