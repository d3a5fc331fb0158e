//! Appointment database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{DbError, DbResult, StorageScope};
use crate::models::{check_session_date, Appointment, AppointmentSummary, NewAppointment};

impl StorageScope<'_> {
    /// Insert a new appointment, letting storage assign the id.
    pub fn insert_appointment(&self, appointment: &NewAppointment) -> DbResult<Appointment> {
        check_session_date("date", appointment.date)?;
        self.tx.execute(
            r#"
            INSERT INTO atendimentos (date, patient_id, record_done, record_launched)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                appointment.date,
                appointment.patient_id,
                appointment.record_done,
                appointment.record_launched,
            ],
        )?;
        Ok(appointment.clone().with_id(self.tx.last_insert_rowid()))
    }

    /// Insert an appointment keeping the id it already carries (imports).
    pub fn insert_appointment_with_id(&self, appointment: &Appointment) -> DbResult<()> {
        check_session_date("date", appointment.date)?;
        self.tx.execute(
            r#"
            INSERT INTO atendimentos (id, date, patient_id, record_done, record_launched)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                appointment.id,
                appointment.date,
                appointment.patient_id,
                appointment.record_done,
                appointment.record_launched,
            ],
        )?;
        Ok(())
    }

    /// Schedule a session for the first patient with this name.
    ///
    /// Fails with [`DbError::NotFound`] when no such patient exists, so an
    /// appointment never starts out orphaned.
    pub fn schedule_appointment(
        &self,
        patient_name: &str,
        date: NaiveDate,
        record_done: bool,
        record_launched: bool,
    ) -> DbResult<Appointment> {
        let patient = self
            .find_patient_by_name(patient_name)?
            .ok_or_else(|| DbError::NotFound(format!("patient '{}'", patient_name)))?;

        self.insert_appointment(&NewAppointment {
            date,
            patient_id: patient.id,
            record_done,
            record_launched,
        })
    }

    /// Update an existing appointment by id.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        check_session_date("date", appointment.date)?;
        let rows_affected = self.tx.execute(
            r#"
            UPDATE atendimentos SET
                date = ?2,
                patient_id = ?3,
                record_done = ?4,
                record_launched = ?5
            WHERE id = ?1
            "#,
            params![
                appointment.id,
                appointment.date,
                appointment.patient_id,
                appointment.record_done,
                appointment.record_launched,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an appointment by id.
    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        self.tx
            .query_row(
                r#"
                SELECT id, date, patient_id, record_done, record_launched
                FROM atendimentos
                WHERE id = ?
                "#,
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether an appointment with this id exists.
    pub fn appointment_exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = self
            .tx
            .query_row("SELECT 1 FROM atendimentos WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// List all appointments in storage (id) order.
    pub fn list_appointments(&self) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.tx.prepare(
            r#"
            SELECT id, date, patient_id, record_done, record_launched
            FROM atendimentos
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Most recent sessions first, with the patient's name when it still exists.
    pub fn latest_appointments(&self, limit: usize) -> DbResult<Vec<AppointmentSummary>> {
        let mut stmt = self.tx.prepare(
            r#"
            SELECT a.id, a.date, a.patient_id, a.record_done, a.record_launched, p.name
            FROM atendimentos a
            LEFT JOIN pacientes p ON p.id = a.patient_id
            ORDER BY a.date DESC, a.id DESC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(AppointmentSummary {
                appointment: appointment_from_row(row)?,
                patient_name: row.get(5)?,
            })
        })?;

        let summaries = rows.collect::<Result<Vec<_>, _>>()?;
        for summary in summaries.iter().filter(|s| s.patient_name.is_none()) {
            tracing::warn!(
                appointment_id = summary.appointment.id,
                patient_id = summary.appointment.patient_id,
                "appointment references a missing patient"
            );
        }
        Ok(summaries)
    }

    /// Delete an appointment.
    pub fn delete_appointment(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .tx
            .execute("DELETE FROM atendimentos WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        date: row.get(1)?,
        patient_id: row.get(2)?,
        record_done: row.get(3)?,
        record_launched: row.get(4)?,
    })
}
