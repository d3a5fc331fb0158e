//! Parsing of raw form input into typed records.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{normalize_health_plan, NewPatient, WeekDay};

/// A single field that could not be turned into a typed value.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Field or column label
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Patient form contents, exactly as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    /// Weekday display label
    pub attendance_day: String,
    pub time: String,
    pub health_plan: String,
    pub clinic_value: String,
    pub therapist_percentage: String,
}

impl PatientDraft {
    /// Validate the form, producing a record ready for storage.
    pub fn validate(&self) -> Result<NewPatient, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }

        let attendance_day = WeekDay::from_label(&self.attendance_day).ok_or_else(|| {
            ValidationError::new(
                "attendance_day",
                format!("'{}' is not a weekday", self.attendance_day.trim()),
            )
        })?;

        let clinic_value = parse_decimal("clinic_value", &self.clinic_value)?;
        if clinic_value < 0.0 {
            return Err(ValidationError::new("clinic_value", "must not be negative"));
        }

        Ok(NewPatient {
            name: name.to_string(),
            attendance_day,
            time: self.time.trim().to_string(),
            health_plan: normalize_health_plan(Some(&self.health_plan)),
            clinic_value,
            therapist_percentage: parse_decimal(
                "therapist_percentage",
                &self.therapist_percentage,
            )?,
        })
    }
}

/// Parse a decimal that may use `,` or `.` as separator. Blank means zero.
pub fn parse_decimal(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed.replace(',', ".").parse().map_err(|_| {
        ValidationError::new(field, format!("'{}' is not a number", trimmed))
    })?;
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a finite number"));
    }
    Ok(value)
}

/// Years a session date may fall in; spreadsheets cannot hold dates outside it.
pub const SESSION_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Reject session dates the workbook export could not write.
pub fn check_session_date(field: &str, date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if SESSION_YEARS.contains(&date.year()) {
        Ok(date)
    } else {
        Err(ValidationError::new(
            field,
            format!("{} is outside years {}-{}", date, SESSION_YEARS.start(), SESSION_YEARS.end()),
        ))
    }
}

/// Parse a session date typed as `dd-mm-yyyy` or `dd/mm/yyyy`.
pub fn parse_session_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let normalized = raw.trim().replace('/', "-");
    let date = NaiveDate::parse_from_str(&normalized, "%d-%m-%Y").map_err(|_| {
        ValidationError::new("date", format!("'{}' is not a dd-mm-yyyy date", raw.trim()))
    })?;
    check_session_date("date", date)
}
