//! Workbook layout and per-column cell parsers.
//!
//! Export and import share the sheet names and header labels below, so a
//! file written by the exporter is always readable by the importer. On
//! import, columns are located by header label, then each row runs through
//! typed parsers that yield either a record or a [`ValidationError`] naming
//! the offending column.

use std::cmp::Ordering;

use calamine::Data;
use chrono::{Days, NaiveDate};

use super::{ExchangeError, ExchangeResult};
use crate::models::{
    check_session_date, normalize_health_plan, Appointment, Patient, ValidationError, WeekDay,
};

pub const PATIENTS_SHEET: &str = "Pacientes";
pub const APPOINTMENTS_SHEET: &str = "Atendimentos";

pub const COL_ID: &str = "ID";
pub const COL_NAME: &str = "Nome";
pub const COL_ATTENDANCE_DAY: &str = "Dia de Atendimento";
pub const COL_TIME: &str = "Hora";
pub const COL_HEALTH_PLAN: &str = "Plano de Saúde";
pub const COL_CLINIC_VALUE: &str = "Valor da Clínica";
pub const COL_THERAPIST_PERCENTAGE: &str = "Percentual do Terapeuta";

pub const COL_DATE: &str = "Data";
pub const COL_PATIENT_ID: &str = "ID do Paciente";
pub const COL_RECORD_DONE: &str = "Registro Feito";
pub const COL_RECORD_LAUNCHED: &str = "Registro Lançado";

/// Patient sheet columns, in order.
pub const PATIENT_HEADERS: [&str; 7] = [
    COL_ID,
    COL_NAME,
    COL_ATTENDANCE_DAY,
    COL_TIME,
    COL_HEALTH_PLAN,
    COL_CLINIC_VALUE,
    COL_THERAPIST_PERCENTAGE,
];

/// Appointment sheet columns, in order.
pub const APPOINTMENT_HEADERS: [&str; 5] = [
    COL_ID,
    COL_DATE,
    COL_PATIENT_ID,
    COL_RECORD_DONE,
    COL_RECORD_LAUNCHED,
];

/// Serial of the 1900-02-29 that the 1900 date system counts but the
/// calendar does not have.
const PHANTOM_LEAP_DAY: u64 = 60;

/// Column positions of one sheet, keyed by header label.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    headers: Vec<&'static str>,
    positions: Vec<usize>,
}

impl ColumnMap {
    /// Locate every expected header in the sheet's header row.
    pub fn locate(
        sheet: &str,
        header_row: &[Data],
        expected: &[&'static str],
    ) -> ExchangeResult<Self> {
        let mut positions = Vec::with_capacity(expected.len());
        for header in expected {
            let position = header_row
                .iter()
                .position(|cell| matches!(cell, Data::String(s) if s.trim() == *header))
                .ok_or_else(|| ExchangeError::MissingColumn {
                    sheet: sheet.to_string(),
                    column: header.to_string(),
                })?;
            positions.push(position);
        }
        Ok(Self {
            headers: expected.to_vec(),
            positions,
        })
    }

    /// Borrow one data row through this layout.
    pub fn row<'r>(&'r self, cells: &'r [Data]) -> RowCells<'r> {
        RowCells { map: self, cells }
    }
}

/// One data row with typed, column-addressed accessors.
pub struct RowCells<'r> {
    map: &'r ColumnMap,
    cells: &'r [Data],
}

impl<'r> RowCells<'r> {
    fn cell(&self, column: &str) -> &'r Data {
        self.map
            .headers
            .iter()
            .position(|h| *h == column)
            .and_then(|i| self.cells.get(self.map.positions[i]))
            .unwrap_or(&Data::Empty)
    }

    /// Whether every cell of the row is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| match cell {
            Data::Empty => true,
            Data::String(s) => s.trim().is_empty(),
            _ => false,
        })
    }

    pub fn integer(&self, column: &str) -> Result<i64, ValidationError> {
        match self.cell(column) {
            Data::Int(i) => Ok(*i),
            Data::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            Data::String(s) => s
                .trim()
                .parse()
                .map_err(|_| ValidationError::new(column, format!("'{}' is not an integer", s.trim()))),
            Data::Empty => Err(ValidationError::new(column, "is empty")),
            other => Err(ValidationError::new(
                column,
                format!("'{}' is not an integer", other),
            )),
        }
    }

    /// Decimal value; blank means zero, `,` is accepted as separator.
    pub fn decimal(&self, column: &str) -> Result<f64, ValidationError> {
        match self.cell(column) {
            Data::Float(f) if f.is_finite() => Ok(*f),
            Data::Int(i) => Ok(*i as f64),
            Data::String(s) => crate::models::parse_decimal(column, s),
            Data::Empty => Ok(0.0),
            other => Err(ValidationError::new(
                column,
                format!("'{}' is not a number", other),
            )),
        }
    }

    /// Free text, verbatim. Numbers are rendered as written; time-of-day
    /// cells as `HH:MM`.
    pub fn text(&self, column: &str) -> Result<String, ValidationError> {
        match self.cell(column) {
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Ok(s.clone()),
            Data::Int(i) => Ok(i.to_string()),
            Data::Float(f) => Ok(f.to_string()),
            Data::Bool(b) => Ok(b.to_string()),
            Data::DateTime(dt) => Ok(clock_time(dt.as_f64())),
            Data::Empty => Ok(String::new()),
            other => Err(ValidationError::new(column, format!("cell error {}", other))),
        }
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<String>, ValidationError> {
        let text = self.text(column)?;
        Ok(if text.trim().is_empty() { None } else { Some(text) })
    }

    /// Date from a native date cell, a serial number or `YYYY-MM-DD` /
    /// `dd-mm-yyyy` / `dd/mm/yyyy` text.
    pub fn date(&self, column: &str) -> Result<NaiveDate, ValidationError> {
        let invalid = |shown: String| ValidationError::new(column, format!("'{}' is not a date", shown));
        let date = match self.cell(column) {
            Data::DateTime(dt) => serial_to_date(dt.as_f64()).ok_or_else(|| invalid(dt.as_f64().to_string())),
            Data::Float(f) => serial_to_date(*f).ok_or_else(|| invalid(f.to_string())),
            Data::Int(i) => serial_to_date(*i as f64).ok_or_else(|| invalid(i.to_string())),
            Data::String(s) | Data::DateTimeIso(s) => {
                parse_date_text(s).ok_or_else(|| invalid(s.trim().to_string()))
            }
            Data::Empty => Err(ValidationError::new(column, "is empty")),
            other => Err(invalid(other.to_string())),
        }?;
        check_session_date(column, date)
    }

    /// Boolean flag; blank means `false`.
    pub fn flag(&self, column: &str) -> Result<bool, ValidationError> {
        match self.cell(column) {
            Data::Bool(b) => Ok(*b),
            Data::Int(0) => Ok(false),
            Data::Int(1) => Ok(true),
            Data::Float(f) if *f == 0.0 => Ok(false),
            Data::Float(f) if *f == 1.0 => Ok(true),
            Data::Empty => Ok(false),
            Data::String(s) => match s.trim().to_lowercase().as_str() {
                "" | "false" | "falso" | "não" | "nao" | "0" => Ok(false),
                "true" | "verdadeiro" | "sim" | "1" => Ok(true),
                other => Err(ValidationError::new(
                    column,
                    format!("'{}' is not true/false", other),
                )),
            },
            other => Err(ValidationError::new(
                column,
                format!("'{}' is not true/false", other),
            )),
        }
    }

    pub fn weekday(&self, column: &str) -> Result<WeekDay, ValidationError> {
        let label = self.text(column)?;
        WeekDay::from_label(&label).ok_or_else(|| {
            ValidationError::new(column, format!("'{}' is not a valid weekday", label.trim()))
        })
    }

    /// Parse a patient sheet row.
    pub fn patient(&self) -> Result<Patient, ValidationError> {
        let clinic_value = self.decimal(COL_CLINIC_VALUE)?;
        if clinic_value < 0.0 {
            return Err(ValidationError::new(COL_CLINIC_VALUE, "must not be negative"));
        }
        Ok(Patient {
            id: self.integer(COL_ID)?,
            name: self.text(COL_NAME)?,
            attendance_day: self.weekday(COL_ATTENDANCE_DAY)?,
            time: self.text(COL_TIME)?,
            health_plan: normalize_health_plan(self.optional_text(COL_HEALTH_PLAN)?.as_deref()),
            clinic_value,
            therapist_percentage: self.decimal(COL_THERAPIST_PERCENTAGE)?,
        })
    }

    /// Parse an appointment sheet row.
    pub fn appointment(&self) -> Result<Appointment, ValidationError> {
        Ok(Appointment {
            id: self.integer(COL_ID)?,
            date: self.date(COL_DATE)?,
            patient_id: self.integer(COL_PATIENT_ID)?,
            record_done: self.flag(COL_RECORD_DONE)?,
            record_launched: self.flag(COL_RECORD_LAUNCHED)?,
        })
    }
}

/// Whole days of a spreadsheet serial in the 1900 date system.
///
/// Serial 1 is 1900-01-01 and serial 61 is 1900-03-01; serial 60 is the
/// nonexistent 1900-02-29 and serial 0 is "1900-01-00", neither of which is a date.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let (epoch, days) = match days.cmp(&PHANTOM_LEAP_DAY) {
        Ordering::Less => (NaiveDate::from_ymd_opt(1899, 12, 31)?, days),
        Ordering::Equal => return None,
        Ordering::Greater => (NaiveDate::from_ymd_opt(1899, 12, 30)?, days),
    };
    epoch.checked_add_days(Days::new(days))
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&trimmed.replace('/', "-"), "%d-%m-%Y"))
        .ok()
}

/// Fractional day rendered as `HH:MM`.
fn clock_time(serial: f64) -> String {
    let minutes = (serial.fract() * 24.0 * 60.0).round() as u32 % (24 * 60);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
