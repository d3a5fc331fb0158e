//! SQLite schema definition.

/// Complete database schema for the clinic ledger.
///
/// Foreign keys are declared for documentation but `PRAGMA foreign_keys` is
/// left off: deleting a patient keeps its appointments as orphans.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS pacientes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    attendance_day TEXT NOT NULL CHECK (attendance_day IN (
        'MONDAY', 'TUESDAY', 'WEDNESDAY', 'THURSDAY', 'FRIDAY', 'SATURDAY', 'SUNDAY'
    )),
    time TEXT NOT NULL DEFAULT '',
    health_plan TEXT,                            -- upper-case, NULL = no plan
    clinic_value REAL NOT NULL DEFAULT 0,
    therapist_percentage REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_pacientes_name ON pacientes(name);
CREATE INDEX IF NOT EXISTS idx_pacientes_health_plan ON pacientes(health_plan);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS atendimentos (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,                          -- YYYY-MM-DD
    patient_id INTEGER NOT NULL REFERENCES pacientes(id),
    record_done INTEGER NOT NULL DEFAULT 0,
    record_launched INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_atendimentos_date ON atendimentos(date);
CREATE INDEX IF NOT EXISTS idx_atendimentos_patient ON atendimentos(patient_id);
"#;
