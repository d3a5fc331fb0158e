//! Workbook import with skip-and-report handling of bad rows.
//!
//! Rows whose id already exists are never updated: they are skipped with a
//! [`NoticeKind::DuplicateId`] notice. Rows that fail to parse are skipped
//! with a [`NoticeKind::Invalid`] notice. Everything else is inserted with the
//! id from the sheet. The caller's scope decides atomicity: a storage error
//! aborts the call and the scope rolls back every row it inserted.

use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Sheets};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    ColumnMap, ExchangeError, ExchangeResult, APPOINTMENTS_SHEET, APPOINTMENT_HEADERS, COL_ID,
    PATIENTS_SHEET, PATIENT_HEADERS,
};
use crate::db::{Database, StorageScope};
use crate::models::ValidationError;

/// Why a row was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoticeKind {
    /// A record with this id is already stored; updates are not permitted
    DuplicateId,
    /// A cell could not be parsed
    Invalid(ValidationError),
}

/// A skipped row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportNotice {
    pub sheet: String,
    /// 1-based row number as shown by spreadsheet programs
    pub row: usize,
    /// Row id, when it could be read
    pub record_id: Option<i64>,
    pub kind: NoticeKind,
}

impl fmt::Display for ImportNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NoticeKind::DuplicateId => write!(
                f,
                "{} row {}: id {} already exists, update not permitted",
                self.sheet,
                self.row,
                self.record_id.unwrap_or_default()
            ),
            NoticeKind::Invalid(e) => write!(f, "{} row {}: {}", self.sheet, self.row, e),
        }
    }
}

/// Outcome of an import call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub patients_imported: usize,
    pub appointments_imported: usize,
    pub notices: Vec<ImportNotice>,
}

impl ImportReport {
    pub fn duplicates(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| n.kind == NoticeKind::DuplicateId)
            .count()
    }

    pub fn invalid_rows(&self) -> usize {
        self.notices.len() - self.duplicates()
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn skip(&mut self, sheet: &str, row: usize, record_id: Option<i64>, kind: NoticeKind) {
        let notice = ImportNotice {
            sheet: sheet.to_string(),
            row,
            record_id,
            kind,
        };
        warn!(%notice, "import row skipped");
        self.notices.push(notice);
    }
}

/// Cell rows of one sheet, header row first.
#[derive(Debug, Clone, Default)]
pub struct SheetRows {
    /// 0-based sheet row of `rows[0]`
    first_row: usize,
    rows: Vec<Vec<Data>>,
}

impl SheetRows {
    pub fn new(first_row: usize, rows: Vec<Vec<Data>>) -> Self {
        Self { first_row, rows }
    }
}

/// Both sheets of an import workbook, read before storage is touched.
#[derive(Debug, Clone, Default)]
pub struct WorkbookRows {
    pub patients: SheetRows,
    pub appointments: SheetRows,
}

impl WorkbookRows {
    /// Read the patient and appointment sheets from a workbook file.
    pub fn read(path: &Path) -> ExchangeResult<Self> {
        let bytes = std::fs::read(path)?;
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Self {
            patients: sheet_rows(&mut workbook, PATIENTS_SHEET)?,
            appointments: sheet_rows(&mut workbook, APPOINTMENTS_SHEET)?,
        })
    }
}

fn sheet_rows<RS: Read + Seek>(workbook: &mut Sheets<RS>, name: &str) -> ExchangeResult<SheetRows> {
    if !workbook.sheet_names().iter().any(|n| n.as_str() == name) {
        return Err(ExchangeError::MissingSheet(name.to_string()));
    }
    let range = workbook.worksheet_range(name)?;
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    Ok(SheetRows::new(
        first_row,
        range.rows().map(|cells| cells.to_vec()).collect(),
    ))
}

/// Spreadsheet importer bound to one storage scope.
pub struct SpreadsheetImporter<'a> {
    scope: &'a StorageScope<'a>,
}

impl<'a> SpreadsheetImporter<'a> {
    pub fn new(scope: &'a StorageScope<'a>) -> Self {
        Self { scope }
    }

    /// Insert every acceptable row, patients first.
    pub fn import(&self, workbook: &WorkbookRows) -> ExchangeResult<ImportReport> {
        let mut report = ImportReport::default();
        self.import_patients(&workbook.patients, &mut report)?;
        self.import_appointments(&workbook.appointments, &mut report)?;
        Ok(report)
    }

    fn import_patients(&self, sheet: &SheetRows, report: &mut ImportReport) -> ExchangeResult<()> {
        let Some((header, data)) = sheet.rows.split_first() else {
            return Ok(());
        };
        let columns = ColumnMap::locate(PATIENTS_SHEET, header, &PATIENT_HEADERS)?;

        for (offset, cells) in data.iter().enumerate() {
            let row_number = sheet.first_row + offset + 2;
            let row = columns.row(cells);
            if row.is_blank() {
                continue;
            }

            let id = match row.integer(COL_ID) {
                Ok(id) => id,
                Err(e) => {
                    report.skip(PATIENTS_SHEET, row_number, None, NoticeKind::Invalid(e));
                    continue;
                }
            };
            if self.scope.patient_exists(id)? {
                report.skip(PATIENTS_SHEET, row_number, Some(id), NoticeKind::DuplicateId);
                continue;
            }

            match row.patient() {
                Ok(patient) => {
                    self.scope.insert_patient_with_id(&patient)?;
                    report.patients_imported += 1;
                }
                Err(e) => report.skip(PATIENTS_SHEET, row_number, Some(id), NoticeKind::Invalid(e)),
            }
        }
        Ok(())
    }

    fn import_appointments(
        &self,
        sheet: &SheetRows,
        report: &mut ImportReport,
    ) -> ExchangeResult<()> {
        let Some((header, data)) = sheet.rows.split_first() else {
            return Ok(());
        };
        let columns = ColumnMap::locate(APPOINTMENTS_SHEET, header, &APPOINTMENT_HEADERS)?;

        for (offset, cells) in data.iter().enumerate() {
            let row_number = sheet.first_row + offset + 2;
            let row = columns.row(cells);
            if row.is_blank() {
                continue;
            }

            let id = match row.integer(COL_ID) {
                Ok(id) => id,
                Err(e) => {
                    report.skip(APPOINTMENTS_SHEET, row_number, None, NoticeKind::Invalid(e));
                    continue;
                }
            };
            if self.scope.appointment_exists(id)? {
                report.skip(APPOINTMENTS_SHEET, row_number, Some(id), NoticeKind::DuplicateId);
                continue;
            }

            match row.appointment() {
                Ok(appointment) => {
                    self.scope.insert_appointment_with_id(&appointment)?;
                    report.appointments_imported += 1;
                }
                Err(e) => {
                    report.skip(APPOINTMENTS_SHEET, row_number, Some(id), NoticeKind::Invalid(e))
                }
            }
        }
        Ok(())
    }
}

/// Import a workbook in a fresh scope; all inserts commit together or not at all.
pub fn import_from_file<P: AsRef<Path>>(db: &mut Database, path: P) -> ExchangeResult<ImportReport> {
    let path = path.as_ref();
    let workbook = WorkbookRows::read(path)?;
    let report = db.with_scope(|scope| SpreadsheetImporter::new(scope).import(&workbook))?;
    info!(
        path = %path.display(),
        patients = report.patients_imported,
        appointments = report.appointments_imported,
        skipped = report.notices.len(),
        "spreadsheet imported"
    );
    Ok(report)
}
