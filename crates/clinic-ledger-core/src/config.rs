//! Runtime configuration.
//!
//! Resolved once by the host at startup and passed into [`crate::open_clinic`];
//! nothing in the library reads environment variables.

use std::path::{Path, PathBuf};

use crate::db::{Database, DbResult};
use crate::models::ValidationError;

/// Database file used when the host does not choose one.
pub const DEFAULT_DATABASE_FILE: &str = "psicologia.db";

/// Where the clinic database lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

/// Clinic configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClinicConfig {
    database: DatabaseLocation,
}

impl ClinicConfig {
    /// Configuration backed by the database file at `database_path`.
    pub fn new(database_path: PathBuf) -> Result<Self, ValidationError> {
        if database_path.as_os_str().is_empty() {
            return Err(ValidationError::new("database_path", "cannot be empty"));
        }
        Ok(Self {
            database: DatabaseLocation::File(database_path),
        })
    }

    /// Configuration backed by a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseLocation::InMemory,
        }
    }

    pub fn database(&self) -> &DatabaseLocation {
        &self.database
    }

    /// Database file path, `None` for in-memory configurations.
    pub fn database_path(&self) -> Option<&Path> {
        match &self.database {
            DatabaseLocation::File(path) => Some(path),
            DatabaseLocation::InMemory => None,
        }
    }

    /// Open (creating if needed) the configured database.
    pub fn open(&self) -> DbResult<Database> {
        match &self.database {
            DatabaseLocation::File(path) => Database::open(path),
            DatabaseLocation::InMemory => Database::open_in_memory(),
        }
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE_FILE)),
        }
    }
}
