//! Patient models.

use serde::{Deserialize, Serialize};

use super::WeekDay;

/// A clinic patient with billing and scheduling metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Storage-assigned id (or taken verbatim from an imported sheet)
    pub id: i64,
    /// Display name. Not unique; name lookups resolve to the first match.
    pub name: String,
    /// Usual attendance day (advisory only)
    pub attendance_day: WeekDay,
    /// Usual time of day, free text
    pub time: String,
    /// Health plan label, upper-case, `None` for private patients
    pub health_plan: Option<String>,
    /// Amount the clinic charges per session
    pub clinic_value: f64,
    /// Share of `clinic_value` paid to the therapist, in percent
    pub therapist_percentage: f64,
}

impl Patient {
    /// Amount paid to the therapist for one session.
    pub fn therapist_value(&self) -> f64 {
        therapist_value(self.clinic_value, self.therapist_percentage)
    }
}

/// Patient fields before storage assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub attendance_day: WeekDay,
    pub time: String,
    pub health_plan: Option<String>,
    pub clinic_value: f64,
    pub therapist_percentage: f64,
}

impl NewPatient {
    /// Create a new patient with required fields.
    pub fn new(name: String, attendance_day: WeekDay) -> Self {
        Self {
            name,
            attendance_day,
            time: String::new(),
            health_plan: None,
            clinic_value: 0.0,
            therapist_percentage: 0.0,
        }
    }

    /// Attach the id storage assigned.
    pub fn with_id(self, id: i64) -> Patient {
        Patient {
            id,
            name: self.name,
            attendance_day: self.attendance_day,
            time: self.time,
            health_plan: self.health_plan,
            clinic_value: self.clinic_value,
            therapist_percentage: self.therapist_percentage,
        }
    }
}

/// `clinic_value * therapist_percentage / 100`.
pub fn therapist_value(clinic_value: f64, therapist_percentage: f64) -> f64 {
    clinic_value * (therapist_percentage / 100.0)
}

/// Canonical form of a health plan label: trimmed, upper-case, blank → `None`.
///
/// Applied on every write path so that filtering and grouping compare
/// consistently regardless of how the label was typed.
pub fn normalize_health_plan(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|plan| !plan.is_empty())
        .map(str::to_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = NewPatient::new("Ana".into(), WeekDay::Monday).with_id(7);
        assert_eq!(patient.id, 7);
        assert_eq!(patient.name, "Ana");
        assert_eq!(patient.health_plan, None);
        assert_eq!(patient.therapist_value(), 0.0);
    }

    #[test]
    fn test_therapist_value() {
        let mut patient = NewPatient::new("Ana".into(), WeekDay::Monday).with_id(1);
        patient.clinic_value = 150.0;
        patient.therapist_percentage = 60.0;
        assert!((patient.therapist_value() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_health_plan() {
        assert_eq!(normalize_health_plan(Some(" unimed ")), Some("UNIMED".into()));
        assert_eq!(normalize_health_plan(Some("Sulamérica")), Some("SULAMÉRICA".into()));
        assert_eq!(normalize_health_plan(Some("   ")), None);
        assert_eq!(normalize_health_plan(None), None);
    }
}
