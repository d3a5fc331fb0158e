//! Spreadsheet exchange: full export to and row-by-row import from a
//! two-sheet workbook.

mod columns;
mod export;
mod import;

pub use columns::*;
pub use export::*;
pub use import::*;

use thiserror::Error;

use crate::db::DbError;

/// Errors that abort a whole export or import call.
///
/// Problems confined to a single row are reported as [`ImportNotice`]s
/// instead.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet read error: {0}")]
    Read(calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },
}

impl From<calamine::Error> for ExchangeError {
    fn from(e: calamine::Error) -> Self {
        match e {
            calamine::Error::Io(io) => ExchangeError::Io(io),
            other => ExchangeError::Read(other),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
