//! Database layer for the clinic ledger.
//!
//! Every read and write goes through a [`StorageScope`], an explicit
//! transaction handed to the component that needs it. A scope that is
//! dropped without [`StorageScope::commit`] rolls back, so early returns and
//! `?` propagation never leave partial writes behind.

mod appointments;
mod patients;
mod schema;

pub use schema::*;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use thiserror::Error;

use crate::models::ValidationError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transactional scope.
    pub fn scope(&mut self) -> DbResult<StorageScope<'_>> {
        Ok(StorageScope {
            tx: self.conn.transaction()?,
        })
    }

    /// Run `f` inside a scope: commit on `Ok`, roll back on `Err`.
    pub fn with_scope<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&StorageScope<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let scope = self.scope()?;
        let value = f(&scope)?;
        scope.commit()?;
        Ok(value)
    }
}

/// One transaction against the clinic database.
///
/// Patient and appointment operations live on the scope so the same code
/// serves single edits and bulk imports.
pub struct StorageScope<'conn> {
    tx: Transaction<'conn>,
}

impl StorageScope<'_> {
    /// Make every write in this scope durable.
    pub fn commit(self) -> DbResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    /// Discard every write in this scope.
    pub fn rollback(self) -> DbResult<()> {
        self.tx.rollback()?;
        Ok(())
    }

    /// Get the underlying connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.tx
    }
}
