//! Clinic Ledger Core Library
//!
//! Local-first bookkeeping for a small therapy practice: patients, the
//! sessions they attend, therapist income statistics and a two-sheet
//! spreadsheet exchange.
//!
//! # Architecture
//!
//! ```text
//!   Host UI (forms, session list, statistics panel)
//!                       │
//!                 ClinicLedger (FFI)
//!                       │
//!          Database::scope() → StorageScope
//!                       │
//!        ┌──────────────┼──────────────────┐
//!        │              │                  │
//!        ▼              ▼                  ▼
//!   patients /    IncomeAnalysis    SpreadsheetImporter /
//!  appointments                     SpreadsheetExporter
//! ```
//!
//! # Core Principle
//!
//! **One scope per operation.** Every component receives the transaction it
//! works in; a scope that is not committed rolls back, so a failed import
//! leaves no rows behind.
//!
//! # Modules
//!
//! - [`config`]: Startup configuration (database location)
//! - [`db`]: SQLite storage and the transactional [`db::StorageScope`]
//! - [`models`]: Domain types (Patient, Appointment, WeekDay, form input)
//! - [`stats`]: Appointment counts and therapist income over a period
//! - [`exchange`]: Workbook export and import

pub mod config;
pub mod db;
pub mod exchange;
pub mod models;
pub mod stats;

// Re-export commonly used types
pub use config::ClinicConfig;
pub use db::{Database, DbError, StorageScope};
pub use exchange::{ExchangeError, ImportNotice, ImportReport, NoticeKind};
pub use models::{
    Appointment, AppointmentSummary, NewAppointment, NewPatient, Patient, PatientDraft,
    RecordStatus, ValidationError, WeekDay,
};
pub use stats::{IncomeStatistics, StatsQuery};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::info;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ClinicError::NotFound(what),
            DbError::Validation(v) => ClinicError::InvalidInput(v.to_string()),
            DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message))
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                ClinicError::DuplicateKey(message.unwrap_or_else(|| code.to_string()))
            }
            other => ClinicError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ExchangeError> for ClinicError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::Storage(db) => db.into(),
            ExchangeError::Io(io) => ClinicError::IoError(io.to_string()),
            other @ (ExchangeError::Read(_) | ExchangeError::Write(_)) => {
                ClinicError::IoError(other.to_string())
            }
            other => ClinicError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ValidationError> for ClinicError {
    fn from(e: ValidationError) -> Self {
        ClinicError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions
// =========================================================================

/// Open the database described by `config`.
pub fn open_clinic(config: &ClinicConfig) -> Result<Arc<ClinicLedger>, ClinicError> {
    let db = config.open()?;
    info!(database = ?config.database(), "clinic database opened");
    Ok(Arc::new(ClinicLedger {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicLedger>, ClinicError> {
    open_clinic(&ClinicConfig::new(path.into())?)
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicLedger>, ClinicError> {
    open_clinic(&ClinicConfig::in_memory())
}

/// Render an amount as `R$ 0.00`.
#[uniffi::export]
pub fn format_currency(amount: f64) -> String {
    stats::format_currency(amount)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicLedger {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl ClinicLedger {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Validate a patient form and store it.
    pub fn add_patient(&self, draft: FfiPatientDraft) -> Result<FfiPatient, ClinicError> {
        let new_patient = PatientDraft::from(draft).validate()?;
        let mut db = self.db.lock()?;
        let patient = db.with_scope(|scope| scope.insert_patient(&new_patient))?;
        Ok(patient.into())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, ClinicError> {
        let mut db = self.db.lock()?;
        let patient = db.with_scope(|scope| scope.get_patient(id))?;
        Ok(patient.map(|p| p.into()))
    }

    /// Replace every field of an existing patient.
    pub fn update_patient(&self, patient: FfiPatient) -> Result<(), ClinicError> {
        let patient = Patient::try_from(patient)?;
        let mut db = self.db.lock()?;
        if !db.with_scope(|scope| scope.update_patient(&patient))? {
            return Err(ClinicError::NotFound(format!("patient {}", patient.id)));
        }
        Ok(())
    }

    /// Delete a patient. Their appointments are kept.
    pub fn delete_patient(&self, id: i64) -> Result<(), ClinicError> {
        let mut db = self.db.lock()?;
        if !db.with_scope(|scope| scope.delete_patient(id))? {
            return Err(ClinicError::NotFound(format!("patient {}", id)));
        }
        Ok(())
    }

    /// All patients in id order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, ClinicError> {
        let mut db = self.db.lock()?;
        let patients = db.with_scope(|scope| scope.list_patients())?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name prefix.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, ClinicError> {
        let mut db = self.db.lock()?;
        let patients = db.with_scope(|scope| scope.search_patients(&query, limit as usize))?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Patient filter choices for the statistics panel, `"All"` first.
    pub fn patient_choices(&self) -> Result<Vec<String>, ClinicError> {
        let mut db = self.db.lock()?;
        let names = db.with_scope(|scope| scope.list_patient_names())?;
        Ok(with_all_choice(names))
    }

    /// Health-plan filter choices for the statistics panel, `"All"` first.
    pub fn health_plan_choices(&self) -> Result<Vec<String>, ClinicError> {
        let mut db = self.db.lock()?;
        let plans = db.with_scope(|scope| scope.list_health_plans())?;
        Ok(with_all_choice(plans))
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Record a session for the named patient. `date` is `dd-mm-yyyy` or
    /// `dd/mm/yyyy`.
    pub fn schedule_session(
        &self,
        patient_name: String,
        date: String,
        record_done: bool,
        record_launched: bool,
    ) -> Result<FfiAppointment, ClinicError> {
        let date = models::parse_session_date(&date)?;
        let mut db = self.db.lock()?;
        let appointment = db.with_scope(|scope| {
            scope.schedule_appointment(&patient_name, date, record_done, record_launched)
        })?;
        Ok(appointment.into())
    }

    /// Get an appointment by id.
    pub fn get_appointment(&self, id: i64) -> Result<Option<FfiAppointment>, ClinicError> {
        let mut db = self.db.lock()?;
        let appointment = db.with_scope(|scope| scope.get_appointment(id))?;
        Ok(appointment.map(|a| a.into()))
    }

    /// Replace every field of an existing appointment.
    pub fn update_appointment(&self, appointment: FfiAppointment) -> Result<(), ClinicError> {
        let appointment = Appointment::try_from(appointment)?;
        let mut db = self.db.lock()?;
        if !db.with_scope(|scope| scope.update_appointment(&appointment))? {
            return Err(ClinicError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(())
    }

    /// Delete an appointment.
    pub fn delete_appointment(&self, id: i64) -> Result<(), ClinicError> {
        let mut db = self.db.lock()?;
        if !db.with_scope(|scope| scope.delete_appointment(id))? {
            return Err(ClinicError::NotFound(format!("appointment {}", id)));
        }
        Ok(())
    }

    /// Most recent sessions, newest first, with patient names.
    pub fn latest_sessions(&self, limit: u32) -> Result<Vec<FfiAppointmentSummary>, ClinicError> {
        let mut db = self.db.lock()?;
        let sessions = db.with_scope(|scope| scope.latest_appointments(limit as usize))?;
        Ok(sessions.into_iter().map(|s| s.into()).collect())
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Appointment counts and therapist income over `[start, end]`.
    ///
    /// Dates are `YYYY-MM-DD`; `patient` and `health_plan` are filter labels,
    /// where `"All"` or blank means unfiltered.
    pub fn compute_statistics(
        &self,
        start: String,
        end: String,
        patient: String,
        health_plan: String,
    ) -> Result<FfiStatistics, ClinicError> {
        let query = StatsQuery::new(parse_iso_date("start", &start)?, parse_iso_date("end", &end)?)
            .for_patient(&patient)
            .for_health_plan(&health_plan);
        let mut db = self.db.lock()?;
        let statistics = stats::compute_statistics(&mut db, &query)?;
        Ok(statistics.into())
    }

    // =========================================================================
    // Spreadsheet Exchange
    // =========================================================================

    /// Write every patient and appointment to a workbook.
    pub fn export_spreadsheet(&self, path: String) -> Result<FfiExportSummary, ClinicError> {
        let mut db = self.db.lock()?;
        let summary = exchange::export_to_file(&mut db, &path)?;
        Ok(summary.into())
    }

    /// Insert every new row of a workbook; existing ids are skipped.
    pub fn import_spreadsheet(&self, path: String) -> Result<FfiImportReport, ClinicError> {
        let mut db = self.db.lock()?;
        let report = exchange::import_from_file(&mut db, &path)?;
        Ok(report.into())
    }
}

fn with_all_choice(values: Vec<String>) -> Vec<String> {
    std::iter::once(stats::ALL.to_string()).chain(values).collect()
}

fn parse_iso_date(field: &str, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a YYYY-MM-DD date", raw.trim())))
}

fn parse_weekday(label: &str) -> Result<WeekDay, ValidationError> {
    WeekDay::from_label(label).ok_or_else(|| {
        ValidationError::new("attendance_day", format!("'{}' is not a weekday", label.trim()))
    })
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientDraft {
    pub name: String,
    pub attendance_day: String,
    pub time: String,
    pub health_plan: String,
    pub clinic_value: String,
    pub therapist_percentage: String,
}

impl From<FfiPatientDraft> for PatientDraft {
    fn from(draft: FfiPatientDraft) -> Self {
        PatientDraft {
            name: draft.name,
            attendance_day: draft.attendance_day,
            time: draft.time,
            health_plan: draft.health_plan,
            clinic_value: draft.clinic_value,
            therapist_percentage: draft.therapist_percentage,
        }
    }
}

/// FFI-safe patient. The weekday travels as its display label.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: i64,
    pub name: String,
    pub attendance_day: String,
    pub time: String,
    pub health_plan: Option<String>,
    pub clinic_value: f64,
    pub therapist_percentage: f64,
    pub therapist_value: f64,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            therapist_value: patient.therapist_value(),
            id: patient.id,
            name: patient.name,
            attendance_day: patient.attendance_day.label().to_string(),
            time: patient.time,
            health_plan: patient.health_plan,
            clinic_value: patient.clinic_value,
            therapist_percentage: patient.therapist_percentage,
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = ValidationError;

    fn try_from(patient: FfiPatient) -> Result<Self, Self::Error> {
        if patient.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if patient.clinic_value < 0.0 {
            return Err(ValidationError::new("clinic_value", "must not be negative"));
        }
        Ok(Patient {
            id: patient.id,
            name: patient.name.trim().to_string(),
            attendance_day: parse_weekday(&patient.attendance_day)?,
            time: patient.time,
            health_plan: patient.health_plan,
            clinic_value: patient.clinic_value,
            therapist_percentage: patient.therapist_percentage,
        })
    }
}

/// FFI-safe appointment. The date travels as `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: i64,
    pub date: String,
    pub patient_id: i64,
    pub record_done: bool,
    pub record_launched: bool,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            date: appointment.date.format("%Y-%m-%d").to_string(),
            patient_id: appointment.patient_id,
            record_done: appointment.record_done,
            record_launched: appointment.record_launched,
        }
    }
}

impl TryFrom<FfiAppointment> for Appointment {
    type Error = ValidationError;

    fn try_from(appointment: FfiAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: appointment.id,
            date: models::check_session_date("date", parse_iso_date("date", &appointment.date)?)?,
            patient_id: appointment.patient_id,
            record_done: appointment.record_done,
            record_launched: appointment.record_launched,
        })
    }
}

/// Documentation state of a session, for list highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiRecordStatus {
    Pending,
    DoneNotLaunched,
    Complete,
}

impl From<RecordStatus> for FfiRecordStatus {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Pending => FfiRecordStatus::Pending,
            RecordStatus::DoneNotLaunched => FfiRecordStatus::DoneNotLaunched,
            RecordStatus::Complete => FfiRecordStatus::Complete,
        }
    }
}

/// FFI-safe session list entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentSummary {
    pub appointment: FfiAppointment,
    /// `None` when the patient was deleted
    pub patient_name: Option<String>,
    pub status: FfiRecordStatus,
}

impl From<AppointmentSummary> for FfiAppointmentSummary {
    fn from(summary: AppointmentSummary) -> Self {
        Self {
            status: summary.appointment.record_status().into(),
            appointment: summary.appointment.into(),
            patient_name: summary.patient_name,
        }
    }
}

/// Appointment count for one health plan.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiPlanCount {
    pub health_plan: Option<String>,
    pub count: u64,
}

/// FFI-safe statistics, with display strings precomputed.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatistics {
    pub total_appointments: u64,
    pub by_health_plan: Vec<FfiPlanCount>,
    pub therapist_income: f64,
    pub unlinked_appointments: u64,
    pub plan_summary: String,
    pub income_display: String,
}

impl From<IncomeStatistics> for FfiStatistics {
    fn from(statistics: IncomeStatistics) -> Self {
        Self {
            plan_summary: statistics.plan_summary(),
            income_display: stats::format_currency(statistics.therapist_income),
            total_appointments: statistics.total_appointments,
            by_health_plan: statistics
                .by_health_plan
                .into_iter()
                .map(|(health_plan, count)| FfiPlanCount { health_plan, count })
                .collect(),
            therapist_income: statistics.therapist_income,
            unlinked_appointments: statistics.unlinked_appointments,
        }
    }
}

/// FFI-safe export summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExportSummary {
    pub patients: u32,
    pub appointments: u32,
}

impl From<exchange::ExportSummary> for FfiExportSummary {
    fn from(summary: exchange::ExportSummary) -> Self {
        Self {
            patients: summary.patients as u32,
            appointments: summary.appointments as u32,
        }
    }
}

/// FFI-safe skipped import row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportNotice {
    pub sheet: String,
    pub row: u32,
    pub record_id: Option<i64>,
    pub duplicate: bool,
    pub message: String,
}

impl From<ImportNotice> for FfiImportNotice {
    fn from(notice: ImportNotice) -> Self {
        Self {
            message: notice.to_string(),
            duplicate: notice.kind == NoticeKind::DuplicateId,
            sheet: notice.sheet,
            row: notice.row as u32,
            record_id: notice.record_id,
        }
    }
}

/// FFI-safe import report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    pub patients_imported: u32,
    pub appointments_imported: u32,
    pub notices: Vec<FfiImportNotice>,
}

impl From<ImportReport> for FfiImportReport {
    fn from(report: ImportReport) -> Self {
        Self {
            patients_imported: report.patients_imported as u32,
            appointments_imported: report.appointments_imported as u32,
            notices: report.notices.into_iter().map(|n| n.into()).collect(),
        }
    }
}
