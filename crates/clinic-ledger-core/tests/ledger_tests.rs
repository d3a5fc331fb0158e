//! End-to-end tests through the `ClinicLedger` facade.

use clinic_ledger_core::{
    open_clinic, open_database, open_database_in_memory, ClinicConfig, ClinicError,
    FfiPatientDraft, FfiRecordStatus,
};

fn draft(name: &str, day: &str, plan: &str, value: &str, pct: &str) -> FfiPatientDraft {
    FfiPatientDraft {
        name: name.to_string(),
        attendance_day: day.to_string(),
        time: "14:00".to_string(),
        health_plan: plan.to_string(),
        clinic_value: value.to_string(),
        therapist_percentage: pct.to_string(),
    }
}

#[test]
fn test_patient_lifecycle() {
    let ledger = open_database_in_memory().unwrap();

    let ana = ledger
        .add_patient(draft("Ana", "segunda-feira", " amil ", "150,00", "40"))
        .unwrap();
    assert_eq!(ana.attendance_day, "Segunda-feira");
    assert_eq!(ana.health_plan.as_deref(), Some("AMIL"));
    assert!((ana.therapist_value - 60.0).abs() < 1e-9);

    let mut edited = ana.clone();
    edited.therapist_percentage = 50.0;
    edited.health_plan = Some("unimed".into());
    ledger.update_patient(edited).unwrap();

    let stored = ledger.get_patient(ana.id).unwrap().unwrap();
    assert_eq!(stored.therapist_percentage, 50.0);
    assert_eq!(stored.health_plan.as_deref(), Some("UNIMED"));

    assert_eq!(ledger.search_patients("An".into(), 10).unwrap().len(), 1);
    assert_eq!(ledger.patient_choices().unwrap(), vec!["All", "Ana"]);
    assert_eq!(ledger.health_plan_choices().unwrap(), vec!["All", "UNIMED"]);

    ledger.delete_patient(ana.id).unwrap();
    assert!(ledger.list_patients().unwrap().is_empty());
    assert!(matches!(
        ledger.delete_patient(ana.id),
        Err(ClinicError::NotFound(_))
    ));
}

#[test]
fn test_invalid_patient_form() {
    let ledger = open_database_in_memory().unwrap();

    for bad in [
        draft("", "Domingo", "", "10", "10"),
        draft("Ana", "quinta", "", "10", "10"),
        draft("Ana", "Domingo", "", "dez", "10"),
        draft("Ana", "Domingo", "", "-1", "10"),
    ] {
        assert!(matches!(
            ledger.add_patient(bad),
            Err(ClinicError::InvalidInput(_))
        ));
    }
    assert!(ledger.list_patients().unwrap().is_empty());
}

#[test]
fn test_update_missing_patient() {
    let ledger = open_database_in_memory().unwrap();
    let mut ghost = ledger
        .add_patient(draft("Ana", "Domingo", "", "10", "10"))
        .unwrap();
    ghost.id += 100;
    assert!(matches!(
        ledger.update_patient(ghost),
        Err(ClinicError::NotFound(_))
    ));
}

#[test]
fn test_sessions_and_statistics() {
    let ledger = open_database_in_memory().unwrap();
    ledger
        .add_patient(draft("Ana", "Segunda-feira", "AMIL", "100", "50"))
        .unwrap();
    let bia = ledger
        .add_patient(draft("Bia", "Terça-feira", "", "200", "25"))
        .unwrap();

    let first = ledger
        .schedule_session("Ana".into(), "03/06/2024".into(), true, true)
        .unwrap();
    assert_eq!(first.date, "2024-06-03");
    ledger
        .schedule_session("Ana".into(), "10-06-2024".into(), true, false)
        .unwrap();
    ledger
        .schedule_session("Bia".into(), "11-06-2024".into(), false, false)
        .unwrap();

    assert!(matches!(
        ledger.schedule_session("Nobody".into(), "11-06-2024".into(), false, false),
        Err(ClinicError::NotFound(_))
    ));
    assert!(matches!(
        ledger.schedule_session("Ana".into(), "2024-06-11".into(), false, false),
        Err(ClinicError::InvalidInput(_))
    ));

    let latest = ledger.latest_sessions(10).unwrap();
    let statuses: Vec<_> = latest.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            FfiRecordStatus::Pending,
            FfiRecordStatus::DoneNotLaunched,
            FfiRecordStatus::Complete,
        ]
    );
    assert_eq!(latest[0].patient_name.as_deref(), Some("Bia"));

    let stats = ledger
        .compute_statistics("2024-06-01".into(), "2024-06-30".into(), "All".into(), "All".into())
        .unwrap();
    assert_eq!(stats.total_appointments, 3);
    assert_eq!(stats.income_display, "R$ 150.00");
    assert_eq!(stats.plan_summary, "None: 1, AMIL: 2");

    // Deleting a patient keeps their sessions as orphans
    ledger.delete_patient(bia.id).unwrap();
    let latest = ledger.latest_sessions(1).unwrap();
    assert_eq!(latest[0].patient_name, None);

    let stats = ledger
        .compute_statistics("2024-06-01".into(), "2024-06-30".into(), "".into(), "".into())
        .unwrap();
    assert_eq!(stats.total_appointments, 3);
    assert_eq!(stats.unlinked_appointments, 1);
    assert_eq!(stats.income_display, "R$ 100.00");

    assert!(matches!(
        ledger.compute_statistics("junho".into(), "2024-06-30".into(), "All".into(), "All".into()),
        Err(ClinicError::InvalidInput(_))
    ));
}

#[test]
fn test_update_and_delete_session() {
    let ledger = open_database_in_memory().unwrap();
    ledger
        .add_patient(draft("Ana", "Domingo", "", "100", "50"))
        .unwrap();
    let mut session = ledger
        .schedule_session("Ana".into(), "01-03-2024".into(), false, false)
        .unwrap();

    session.record_done = true;
    session.date = "2024-03-02".into();
    ledger.update_appointment(session.clone()).unwrap();

    let stored = ledger.get_appointment(session.id).unwrap().unwrap();
    assert!(stored.record_done);
    assert_eq!(stored.date, "2024-03-02");

    ledger.delete_appointment(session.id).unwrap();
    assert!(matches!(
        ledger.delete_appointment(session.id),
        Err(ClinicError::NotFound(_))
    ));
    assert!(matches!(
        ledger.update_appointment(session),
        Err(ClinicError::NotFound(_))
    ));
}

#[test]
fn test_session_dates_limited_to_spreadsheet_years() {
    let ledger = open_database_in_memory().unwrap();
    ledger
        .add_patient(draft("Ana", "Domingo", "", "100", "50"))
        .unwrap();

    for bad in ["01-05-224", "31-12-1899", "01-01-10000"] {
        assert!(
            matches!(
                ledger.schedule_session("Ana".into(), bad.into(), false, false),
                Err(ClinicError::InvalidInput(_))
            ),
            "date {:?}",
            bad
        );
    }

    let mut session = ledger
        .schedule_session("Ana".into(), "01-01-1900".into(), false, false)
        .unwrap();
    session.date = "0224-05-01".into();
    assert!(matches!(
        ledger.update_appointment(session.clone()),
        Err(ClinicError::InvalidInput(_))
    ));
    assert_eq!(
        ledger.get_appointment(session.id).unwrap().unwrap().date,
        "1900-01-01"
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.xlsx").to_string_lossy().into_owned();
    let exported = ledger.export_spreadsheet(path).unwrap();
    assert_eq!(exported.appointments, 1);
}

#[test]
fn test_spreadsheet_round_trip_through_facade() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.xlsx").to_string_lossy().into_owned();

    let source = open_database(dir.path().join("source.db").to_string_lossy().into_owned()).unwrap();
    source
        .add_patient(draft("Ana", "Sábado", "amil", "100", "50"))
        .unwrap();
    source
        .schedule_session("Ana".into(), "01-03-2024".into(), true, false)
        .unwrap();

    let exported = source.export_spreadsheet(path.clone()).unwrap();
    assert_eq!(exported.patients, 1);
    assert_eq!(exported.appointments, 1);

    let target = open_clinic(&ClinicConfig::in_memory()).unwrap();
    let report = target.import_spreadsheet(path.clone()).unwrap();
    assert_eq!(report.patients_imported, 1);
    assert_eq!(report.appointments_imported, 1);

    let again = target.import_spreadsheet(path).unwrap();
    assert_eq!(again.notices.len(), 2);
    assert!(again.notices.iter().all(|n| n.duplicate));

    let a = source.list_patients().unwrap();
    let b = target.list_patients().unwrap();
    assert_eq!(a.len(), b.len());
    assert_eq!(a[0].name, b[0].name);
    assert_eq!(a[0].attendance_day, b[0].attendance_day);
}

#[test]
fn test_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = open_database_in_memory().unwrap();

    let missing = dir.path().join("missing.xlsx").to_string_lossy().into_owned();
    assert!(matches!(
        ledger.import_spreadsheet(missing),
        Err(ClinicError::IoError(_))
    ));

    let unwritable = dir.path().join("no-dir").join("out.xlsx").to_string_lossy().into_owned();
    assert!(matches!(
        ledger.export_spreadsheet(unwritable),
        Err(ClinicError::IoError(_))
    ));
}

#[test]
fn test_empty_database_path_rejected() {
    assert!(matches!(
        open_database(String::new()),
        Err(ClinicError::InvalidInput(_))
    ));
}
