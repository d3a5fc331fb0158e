//! Appointment (therapy session) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One billable session tied to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    /// Session date (no time component)
    pub date: NaiveDate,
    /// Owning patient. May dangle once the patient is deleted.
    pub patient_id: i64,
    /// Clinical documentation written
    pub record_done: bool,
    /// Documentation submitted/filed
    pub record_launched: bool,
}

/// Documentation triage state, used to highlight sessions needing attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Record not written yet
    Pending,
    /// Written but not filed
    DoneNotLaunched,
    /// Written and filed
    Complete,
}

impl Appointment {
    pub fn record_status(&self) -> RecordStatus {
        if !self.record_done {
            RecordStatus::Pending
        } else if !self.record_launched {
            RecordStatus::DoneNotLaunched
        } else {
            RecordStatus::Complete
        }
    }
}

/// Appointment fields before storage assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub patient_id: i64,
    pub record_done: bool,
    pub record_launched: bool,
}

impl NewAppointment {
    pub fn new(date: NaiveDate, patient_id: i64) -> Self {
        Self {
            date,
            patient_id,
            record_done: false,
            record_launched: false,
        }
    }

    pub fn with_id(self, id: i64) -> Appointment {
        Appointment {
            id,
            date: self.date,
            patient_id: self.patient_id,
            record_done: self.record_done,
            record_launched: self.record_launched,
        }
    }
}

/// Appointment joined with its patient's name for session lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentSummary {
    pub appointment: Appointment,
    /// `None` when the owning patient no longer exists
    pub patient_name: Option<String>,
}
