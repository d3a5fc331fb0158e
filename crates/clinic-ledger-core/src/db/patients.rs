//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{DbError, DbResult, StorageScope};
use crate::models::{normalize_health_plan, NewPatient, Patient, WeekDay};

const PATIENT_COLUMNS: &str =
    "id, name, attendance_day, time, health_plan, clinic_value, therapist_percentage";

impl StorageScope<'_> {
    /// Insert a new patient, letting storage assign the id.
    pub fn insert_patient(&self, patient: &NewPatient) -> DbResult<Patient> {
        self.tx.execute(
            r#"
            INSERT INTO pacientes (
                name, attendance_day, time, health_plan,
                clinic_value, therapist_percentage
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                patient.name,
                patient.attendance_day.code(),
                patient.time,
                normalize_health_plan(patient.health_plan.as_deref()),
                patient.clinic_value,
                patient.therapist_percentage,
            ],
        )?;
        let id = self.tx.last_insert_rowid();
        self.get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))
    }

    /// Insert a patient keeping the id it already carries (imports).
    pub fn insert_patient_with_id(&self, patient: &Patient) -> DbResult<()> {
        self.tx.execute(
            r#"
            INSERT INTO pacientes (
                id, name, attendance_day, time, health_plan,
                clinic_value, therapist_percentage
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                patient.id,
                patient.name,
                patient.attendance_day.code(),
                patient.time,
                normalize_health_plan(patient.health_plan.as_deref()),
                patient.clinic_value,
                patient.therapist_percentage,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient by id.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.tx.execute(
            r#"
            UPDATE pacientes SET
                name = ?2,
                attendance_day = ?3,
                time = ?4,
                health_plan = ?5,
                clinic_value = ?6,
                therapist_percentage = ?7
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.name,
                patient.attendance_day.code(),
                patient.time,
                normalize_health_plan(patient.health_plan.as_deref()),
                patient.clinic_value,
                patient.therapist_percentage,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.tx
            .query_row(
                &format!("SELECT {} FROM pacientes WHERE id = ?", PATIENT_COLUMNS),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Whether a patient with this id exists.
    pub fn patient_exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = self
            .tx
            .query_row("SELECT 1 FROM pacientes WHERE id = ?", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// First patient (lowest id) with exactly this name.
    pub fn find_patient_by_name(&self, name: &str) -> DbResult<Option<Patient>> {
        self.tx
            .query_row(
                &format!(
                    "SELECT {} FROM pacientes WHERE name = ? ORDER BY id LIMIT 1",
                    PATIENT_COLUMNS
                ),
                [name],
                PatientRow::from_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Search patients by name (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", escape_like(query));
        let mut stmt = self.tx.prepare(&format!(
            r"SELECT {} FROM pacientes WHERE name LIKE ? ESCAPE '\' ORDER BY name LIMIT ?",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// List all patients in storage (id) order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {} FROM pacientes ORDER BY id",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Names of all patients, in storage order, for selection lists.
    pub fn list_patient_names(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.tx.prepare("SELECT name FROM pacientes ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Distinct health plans in use, excluding patients without one.
    pub fn list_health_plans(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.tx.prepare(
            r#"
            SELECT DISTINCT health_plan
            FROM pacientes
            WHERE health_plan IS NOT NULL AND health_plan <> ''
            ORDER BY health_plan
            "#,
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a patient. Their appointments are kept.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.tx.execute("DELETE FROM pacientes WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Escape `LIKE` wildcards so the query matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    name: String,
    attendance_day: String,
    time: String,
    health_plan: Option<String>,
    clinic_value: f64,
    therapist_percentage: f64,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            attendance_day: row.get(2)?,
            time: row.get(3)?,
            health_plan: row.get(4)?,
            clinic_value: row.get(5)?,
            therapist_percentage: row.get(6)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let attendance_day = WeekDay::from_code(&row.attendance_day).ok_or_else(|| {
            DbError::Constraint(format!("Unknown attendance day: {}", row.attendance_day))
        })?;

        Ok(Patient {
            id: row.id,
            name: row.name,
            attendance_day,
            time: row.time,
            health_plan: row.health_plan,
            clinic_value: row.clinic_value,
            therapist_percentage: row.therapist_percentage,
        })
    }
}
