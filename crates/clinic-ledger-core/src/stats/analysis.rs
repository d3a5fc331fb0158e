//! Income analysis over a date range.
//!
//! Filters are applied with fixed precedence: a patient filter wins over a
//! health-plan filter, which wins over the unfiltered view. Income and the
//! per-plan breakdown always join appointments to their owning patient, so
//! appointments whose patient was deleted contribute to neither; they are
//! reported separately as `unlinked_appointments`.

use std::collections::BTreeMap;

use rusqlite::params;
use tracing::debug;

use super::{IncomeStatistics, StatsQuery};
use crate::db::{Database, DbResult, StorageScope};

/// Statistics engine bound to one storage scope.
pub struct IncomeAnalysis<'a> {
    scope: &'a StorageScope<'a>,
}

impl<'a> IncomeAnalysis<'a> {
    pub fn new(scope: &'a StorageScope<'a>) -> Self {
        Self { scope }
    }

    /// Compute appointment counts and therapist income for `query`.
    ///
    /// An inverted range (`start > end`) or an unknown patient yields an
    /// empty result rather than an error.
    pub fn calculate(&self, query: &StatsQuery) -> DbResult<IncomeStatistics> {
        if query.start > query.end {
            debug!(start = %query.start, end = %query.end, "inverted date range");
            return Ok(IncomeStatistics::default());
        }

        if let Some(name) = query.patient.value() {
            debug!(patient = name, "statistics by patient");
            return self.for_patient(name, query);
        }

        let plan = query.normalized_health_plan();
        debug!(health_plan = ?plan, "statistics by health plan");
        self.for_health_plan(plan.as_deref(), query)
    }

    fn for_patient(&self, name: &str, query: &StatsQuery) -> DbResult<IncomeStatistics> {
        let Some(patient) = self.scope.find_patient_by_name(name)? else {
            return Ok(IncomeStatistics::default());
        };
        let conn = self.scope.conn();

        let total: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM atendimentos
            WHERE patient_id = ?1 AND date BETWEEN ?2 AND ?3
            "#,
            params![patient.id, query.start, query.end],
            |row| row.get(0),
        )?;

        let therapist_income: f64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(p.clinic_value * (p.therapist_percentage / 100.0)), 0.0)
            FROM atendimentos a
            JOIN pacientes p ON p.id = a.patient_id
            WHERE a.patient_id = ?1 AND a.date BETWEEN ?2 AND ?3
            "#,
            params![patient.id, query.start, query.end],
            |row| row.get(0),
        )?;

        let total = total as u64;
        Ok(IncomeStatistics {
            total_appointments: total,
            by_health_plan: BTreeMap::from([(patient.health_plan, total)]),
            therapist_income,
            unlinked_appointments: 0,
        })
    }

    /// `plan = None` means every plan, including patients without one.
    fn for_health_plan(
        &self,
        plan: Option<&str>,
        query: &StatsQuery,
    ) -> DbResult<IncomeStatistics> {
        let conn = self.scope.conn();

        // LEFT JOIN keeps orphans in the unfiltered total; a plan filter
        // drops them because their p.health_plan is NULL.
        let total: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM atendimentos a
            LEFT JOIN pacientes p ON p.id = a.patient_id
            WHERE a.date BETWEEN ?1 AND ?2
              AND (?3 IS NULL OR p.health_plan = ?3)
            "#,
            params![query.start, query.end, plan],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT p.health_plan, COUNT(a.id)
            FROM atendimentos a
            JOIN pacientes p ON p.id = a.patient_id
            WHERE a.date BETWEEN ?1 AND ?2
              AND (?3 IS NULL OR p.health_plan = ?3)
            GROUP BY p.health_plan
            "#,
        )?;
        let rows = stmt.query_map(params![query.start, query.end, plan], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut by_health_plan = BTreeMap::new();
        for row in rows {
            let (health_plan, count) = row?;
            by_health_plan.insert(health_plan, count as u64);
        }

        let therapist_income: f64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(p.clinic_value * (p.therapist_percentage / 100.0)), 0.0)
            FROM atendimentos a
            JOIN pacientes p ON p.id = a.patient_id
            WHERE a.date BETWEEN ?1 AND ?2
              AND (?3 IS NULL OR p.health_plan = ?3)
            "#,
            params![query.start, query.end, plan],
            |row| row.get(0),
        )?;

        let total = total as u64;
        let linked: u64 = by_health_plan.values().sum();
        let unlinked_appointments = total.saturating_sub(linked);
        if unlinked_appointments > 0 {
            debug!(
                unlinked = unlinked_appointments,
                "appointments without a patient excluded from income"
            );
        }

        Ok(IncomeStatistics {
            total_appointments: total,
            by_health_plan,
            therapist_income,
            unlinked_appointments,
        })
    }
}

/// Compute statistics in a fresh read scope.
pub fn compute_statistics(db: &mut Database, query: &StatsQuery) -> DbResult<IncomeStatistics> {
    db.with_scope(|scope| IncomeAnalysis::new(scope).calculate(query))
}
