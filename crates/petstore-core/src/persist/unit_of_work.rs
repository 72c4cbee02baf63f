//! Backend seams used by the coordinator and graph loader

use crate::errors::Result;
use crate::mapping::{Row, SqlValue, TableDef};
use crate::model::EntityId;

/// Transactional row writer
///
/// Implementations report their own failures as `PetStoreError::Backend`;
/// the coordinator attaches the entity and table that were being written.
pub trait UnitOfWork {
    /// Open a transaction
    fn begin(&mut self) -> Result<()>;

    /// Write one row and return its key
    ///
    /// Tables with a generated key return the key issued by the backend.
    /// Variant tables return the `id` carried by the row. Join tables
    /// return a backend row number that callers do not bind anywhere.
    fn insert(&mut self, row: &Row) -> Result<EntityId>;

    /// Overwrite `columns` of the row keyed by `id`
    fn update(&mut self, table: &'static str, id: EntityId, columns: &[(&'static str, SqlValue)]) -> Result<()>;

    /// Remove the one row whose columns equal every value in `row`
    fn delete(&mut self, row: &Row) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Read side used to rebuild a graph
pub trait RowSource {
    /// Every row of `table`, columns in `table.columns` order
    fn fetch_all(&self, table: &TableDef) -> Result<Vec<Row>>;
}

/// Open transaction that rolls back unless committed
///
/// Dropping the scope on an early return or a panic releases the
/// transaction through `rollback`.
pub struct TransactionScope<'u, U: UnitOfWork + ?Sized> {
    uow: &'u mut U,
    open: bool,
}

impl<'u, U: UnitOfWork + ?Sized> TransactionScope<'u, U> {
    /// # Errors
    ///
    /// Propagates the backend's `begin` failure; nothing is opened then.
    pub fn begin(uow: &'u mut U) -> Result<Self> {
        uow.begin()?;
        Ok(Self { uow, open: true })
    }

    pub fn uow(&mut self) -> &mut U {
        &mut *self.uow
    }

    /// # Errors
    ///
    /// Propagates the backend's `commit` failure. The scope then rolls back
    /// on drop.
    pub fn commit(mut self) -> Result<()> {
        self.uow.commit()?;
        self.open = false;
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates the backend's `rollback` failure.
    pub fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.uow.rollback()
    }
}

impl<U: UnitOfWork + ?Sized> Drop for TransactionScope<'_, U> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.uow.rollback() {
                tracing::warn!(error = %err, "rollback on scope exit failed");
            }
        }
    }
}
