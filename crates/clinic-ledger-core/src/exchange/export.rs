//! Workbook export of the full patient and appointment tables.

use std::fs::File;
use std::path::Path;

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    ExchangeResult, APPOINTMENTS_SHEET, APPOINTMENT_HEADERS, PATIENTS_SHEET, PATIENT_HEADERS,
};
use crate::db::{Database, StorageScope};
use crate::models::{Appointment, Patient};

/// Row counts written by an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub patients: usize,
    pub appointments: usize,
}

/// Spreadsheet exporter bound to one storage scope.
pub struct SpreadsheetExporter<'a> {
    scope: &'a StorageScope<'a>,
}

impl<'a> SpreadsheetExporter<'a> {
    pub fn new(scope: &'a StorageScope<'a>) -> Self {
        Self { scope }
    }

    /// Dump every patient and appointment into a two-sheet workbook at `path`.
    pub fn export(&self, path: &Path) -> ExchangeResult<ExportSummary> {
        let patients = self.scope.list_patients()?;
        let appointments = self.scope.list_appointments()?;

        let mut workbook = build_workbook(&patients, &appointments)?;

        // Create the file ourselves so an unwritable path surfaces as io::Error
        let file = File::create(path)?;
        workbook.save_to_writer(file)?;

        let summary = ExportSummary {
            patients: patients.len(),
            appointments: appointments.len(),
        };
        info!(
            path = %path.display(),
            patients = summary.patients,
            appointments = summary.appointments,
            "spreadsheet exported"
        );
        Ok(summary)
    }
}

/// Export in a fresh scope.
pub fn export_to_file<P: AsRef<Path>>(db: &mut Database, path: P) -> ExchangeResult<ExportSummary> {
    db.with_scope(|scope| SpreadsheetExporter::new(scope).export(path.as_ref()))
}

fn build_workbook(patients: &[Patient], appointments: &[Appointment]) -> Result<Workbook, XlsxError> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(PATIENTS_SHEET)?;
    write_headers(sheet, &PATIENT_HEADERS, &header_format)?;
    for (i, patient) in patients.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, patient.id as f64)?;
        sheet.write_string(row, 1, &patient.name)?;
        sheet.write_string(row, 2, patient.attendance_day.label())?;
        sheet.write_string(row, 3, &patient.time)?;
        if let Some(plan) = &patient.health_plan {
            sheet.write_string(row, 4, plan)?;
        }
        sheet.write_number(row, 5, patient.clinic_value)?;
        sheet.write_number(row, 6, patient.therapist_percentage)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(APPOINTMENTS_SHEET)?;
    write_headers(sheet, &APPOINTMENT_HEADERS, &header_format)?;
    for (i, appointment) in appointments.iter().enumerate() {
        let row = i as u32 + 1;
        let date = excel_date(appointment.date)?;
        sheet.write_number(row, 0, appointment.id as f64)?;
        sheet.write_datetime_with_format(row, 1, &date, &date_format)?;
        sheet.write_number(row, 2, appointment.patient_id as f64)?;
        sheet.write_boolean(row, 3, appointment.record_done)?;
        sheet.write_boolean(row, 4, appointment.record_launched)?;
    }

    Ok(workbook)
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}

fn excel_date(date: chrono::NaiveDate) -> Result<ExcelDateTime, XlsxError> {
    use chrono::Datelike;
    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)
}
