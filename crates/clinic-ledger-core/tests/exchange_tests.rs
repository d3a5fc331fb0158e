//! Spreadsheet export/import integration tests.

use std::path::Path;

use chrono::NaiveDate;
use clinic_ledger_core::db::{Database, DbError};
use clinic_ledger_core::exchange::{
    export_to_file, import_from_file, ExchangeError, NoticeKind, APPOINTMENTS_SHEET,
    APPOINTMENT_HEADERS, PATIENTS_SHEET, PATIENT_HEADERS,
};
use clinic_ledger_core::models::{Appointment, NewPatient, Patient, WeekDay};
use rust_xlsxwriter::Workbook;

type PatientRow<'a> = [&'a str; 7];
type AppointmentRow<'a> = [&'a str; 5];

/// Write a workbook of text cells; empty strings leave the cell blank.
fn write_workbook(path: &Path, patients: &[PatientRow], appointments: &[AppointmentRow]) {
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, PATIENTS_SHEET, &PATIENT_HEADERS, patients);
    write_sheet(&mut workbook, APPOINTMENTS_SHEET, &APPOINTMENT_HEADERS, appointments);
    workbook.save(path).unwrap();
}

fn write_sheet<const N: usize>(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str; N],
    rows: &[[&str; N]],
) {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).unwrap();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(i as u32 + 1, col as u16, *value).unwrap();
            }
        }
    }
}

fn patients(db: &mut Database) -> Vec<Patient> {
    db.with_scope(|scope| scope.list_patients()).unwrap()
}

fn appointments(db: &mut Database) -> Vec<Appointment> {
    db.with_scope(|scope| scope.list_appointments()).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_export_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.xlsx");

    let mut source = Database::open_in_memory().unwrap();
    source
        .with_scope(|scope| {
            for (i, day) in WeekDay::ALL.iter().enumerate() {
                let id = i as i64 + 1;
                scope.insert_patient_with_id(&Patient {
                    id,
                    name: format!("Paciente {}", id),
                    attendance_day: *day,
                    time: format!("{:02}:30", 8 + i),
                    health_plan: if i % 2 == 0 { Some("AMIL".into()) } else { None },
                    clinic_value: 120.5 + i as f64,
                    therapist_percentage: 37.5,
                })?;
                scope.insert_appointment_with_id(&Appointment {
                    id: 100 + id,
                    date: date(2024, 2, 20 + i as u32),
                    patient_id: id,
                    record_done: i % 2 == 0,
                    record_launched: i % 3 == 0,
                })?;
            }
            // Surrounding blanks are part of the stored text
            scope.insert_patient_with_id(&Patient {
                id: 8,
                name: "Ana ".into(),
                attendance_day: WeekDay::Sunday,
                time: " 9h ".into(),
                health_plan: None,
                clinic_value: 90.0,
                therapist_percentage: 50.0,
            })?;
            // Days before the nonexistent 1900-02-29
            for (id, day) in [(200, date(1900, 1, 15)), (201, date(1900, 2, 28)), (202, date(1900, 3, 1))] {
                scope.insert_appointment_with_id(&Appointment {
                    id,
                    date: day,
                    patient_id: 8,
                    record_done: true,
                    record_launched: true,
                })?;
            }
            // Orphan survives the trip too
            scope.insert_appointment_with_id(&Appointment {
                id: 999,
                date: date(2023, 12, 31),
                patient_id: 4242,
                record_done: false,
                record_launched: false,
            })?;
            Ok::<_, DbError>(())
        })
        .unwrap();

    let summary = export_to_file(&mut source, &path).unwrap();
    assert_eq!(summary.patients, 8);
    assert_eq!(summary.appointments, 11);

    let mut target = Database::open_in_memory().unwrap();
    let report = import_from_file(&mut target, &path).unwrap();
    assert!(report.notices.is_empty(), "{:?}", report.notices);
    assert_eq!(report.patients_imported, 8);
    assert_eq!(report.appointments_imported, 11);

    assert_eq!(patients(&mut target), patients(&mut source));
    assert_eq!(appointments(&mut target), appointments(&mut source));
}

#[test]
fn test_reimport_skips_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.xlsx");

    let mut db = Database::open_in_memory().unwrap();
    db.with_scope(|scope| scope.insert_patient(&NewPatient::new("Ana".into(), WeekDay::Friday)))
        .unwrap();
    export_to_file(&mut db, &path).unwrap();

    let report = import_from_file(&mut db, &path).unwrap();
    assert_eq!(report.patients_imported, 0);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(patients(&mut db).len(), 1);
}

#[test]
fn test_duplicate_id_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.xlsx");
    write_workbook(
        &path,
        &[
            ["1", "Impostor", "Segunda-feira", "10:00", "amil", "50", "10"],
            ["2", "Bia", "Terça-feira", "11:00", "", "80,50", "40"],
        ],
        &[
            ["1", "2024-05-02", "1", "sim", "não"],
            ["2", "03/05/2024", "2", "", ""],
        ],
    );

    let mut db = Database::open_in_memory().unwrap();
    let original = db
        .with_scope(|scope| {
            scope.insert_patient_with_id(&Patient {
                id: 1,
                name: "Original".into(),
                attendance_day: WeekDay::Sunday,
                time: "08:00".into(),
                health_plan: Some("UNIMED".into()),
                clinic_value: 100.0,
                therapist_percentage: 50.0,
            })?;
            scope.get_patient(1)
        })
        .unwrap()
        .unwrap();

    let report = import_from_file(&mut db, &path).unwrap();
    assert_eq!(report.patients_imported, 1);
    assert_eq!(report.appointments_imported, 2);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(report.notices[0].sheet, PATIENTS_SHEET);
    assert_eq!(report.notices[0].row, 2);
    assert_eq!(report.notices[0].record_id, Some(1));

    let stored = patients(&mut db);
    assert_eq!(stored[0], original);
    assert_eq!(stored[1].name, "Bia");
    assert_eq!(stored[1].health_plan, None);
    assert_eq!(stored[1].clinic_value, 80.5);

    let sessions = appointments(&mut db);
    assert_eq!(sessions[0].date, date(2024, 5, 2));
    assert!(sessions[0].record_done);
    assert!(!sessions[0].record_launched);
    assert_eq!(sessions[1].date, date(2024, 5, 3));
}

#[test]
fn test_weekday_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("days.xlsx");
    write_workbook(
        &path,
        &[
            ["1", "Ana", "quinta", "", "", "", ""],
            ["2", "Bia", "Quinta-feira", "", "", "", ""],
            ["3", "Caio", "quinta-feira", "", "", "", ""],
            ["", "", "", "", "", "", ""],
            ["5", "Eva", " SÁBADO ", "", "", "", ""],
        ],
        &[],
    );

    let mut db = Database::open_in_memory().unwrap();
    let report = import_from_file(&mut db, &path).unwrap();

    assert_eq!(report.patients_imported, 3);
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].row, 2);
    assert!(matches!(report.notices[0].kind, NoticeKind::Invalid(_)));

    let stored = patients(&mut db);
    let days: Vec<_> = stored.iter().map(|p| (p.id, p.attendance_day)).collect();
    assert_eq!(
        days,
        vec![
            (2, WeekDay::Thursday),
            (3, WeekDay::Thursday),
            (5, WeekDay::Saturday),
        ]
    );
}

#[test]
fn test_invalid_rows_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.xlsx");
    write_workbook(
        &path,
        &[
            ["x", "Ana", "Domingo", "", "", "", ""],
            ["2", "Bia", "Domingo", "", "", "caro", ""],
            ["3", "Caio", "Domingo", "", "", "-10", ""],
        ],
        &[["1", "31-02-2024", "1", "", ""], ["2", "2024-01-01", "1", "talvez", ""]],
    );

    let mut db = Database::open_in_memory().unwrap();
    let report = import_from_file(&mut db, &path).unwrap();

    assert_eq!(report.patients_imported, 0);
    assert_eq!(report.appointments_imported, 0);
    assert_eq!(report.invalid_rows(), 5);
    assert_eq!(report.notices[0].record_id, None);
    assert!(report
        .notices
        .iter()
        .all(|n| matches!(n.kind, NoticeKind::Invalid(_))));
}

#[test]
fn test_storage_failure_rolls_back_whole_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.xlsx");
    write_workbook(
        &path,
        &[
            ["1", "Ana", "Segunda-feira", "", "", "100", "50"],
            ["2", "Bia", "Terça-feira", "", "", "100", "50"],
        ],
        &[
            ["1", "2024-05-01", "1", "", ""],
            ["2", "2024-05-02", "2", "", ""],
            ["3", "2024-05-03", "2", "", ""],
        ],
    );

    let mut db = Database::open_in_memory().unwrap();
    db.conn()
        .execute_batch(
            r#"
            CREATE TRIGGER fail_third_session BEFORE INSERT ON atendimentos
            WHEN new.id = 3
            BEGIN
                SELECT RAISE(ABORT, 'disk full');
            END;
            "#,
        )
        .unwrap();

    let result = import_from_file(&mut db, &path);
    assert!(matches!(result, Err(ExchangeError::Storage(_))));

    assert!(patients(&mut db).is_empty());
    assert!(appointments(&mut db).is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open_in_memory().unwrap();

    let result = import_from_file(&mut db, dir.path().join("missing.xlsx"));
    assert!(matches!(result, Err(ExchangeError::Io(_))));
}

#[test]
fn test_missing_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.xlsx");
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, PATIENTS_SHEET, &PATIENT_HEADERS, &[]);
    workbook.save(&path).unwrap();

    let mut db = Database::open_in_memory().unwrap();
    match import_from_file(&mut db, &path) {
        Err(ExchangeError::MissingSheet(sheet)) => assert_eq!(sheet, APPOINTMENTS_SHEET),
        other => panic!("expected MissingSheet, got {:?}", other),
    }
}

#[test]
fn test_missing_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("columns.xlsx");
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, PATIENTS_SHEET, &["ID", "Nome"], &[["1", "Ana"]]);
    write_sheet(&mut workbook, APPOINTMENTS_SHEET, &APPOINTMENT_HEADERS, &[]);
    workbook.save(&path).unwrap();

    let mut db = Database::open_in_memory().unwrap();
    let result = import_from_file(&mut db, &path);
    assert!(matches!(result, Err(ExchangeError::MissingColumn { .. })));
    assert!(patients(&mut db).is_empty());
}
