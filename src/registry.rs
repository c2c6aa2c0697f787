//! Patient registry: create-or-update keyed by national ID.
//!
//! The national ID is the natural key of a person. Registering the same
//! national ID again overwrites the demographic fields in place and keeps
//! the patient's id and creation time.

use rusqlite::Connection;

use crate::db::repository;
use crate::error::IntakeError;
use crate::models::{NewPatient, Page, PageRequest, Patient};

/// Insert or overwrite the patient holding `input.info.national_id`.
///
/// Returns the stored patient and whether this call created it. Two
/// concurrent calls with a never-seen national ID produce one row; exactly
/// one of them reports `true`.
pub fn resolve_or_upsert(conn: &Connection, input: &NewPatient) -> Result<(Patient, bool), IntakeError> {
    let national_id = input.info.national_id.trim();
    if national_id.is_empty() {
        return Err(IntakeError::Validation("national ID is required".into()));
    }
    if national_id.len() != input.info.national_id.len() {
        return Err(IntakeError::Validation(
            "national ID must not carry surrounding whitespace".into(),
        ));
    }

    let (patient, created) = repository::upsert_patient_by_national_id(conn, input)?;
    if created {
        tracing::info!(patient_id = %patient.id, "Patient registered");
    } else {
        tracing::debug!(patient_id = %patient.id, "Patient details refreshed");
    }
    Ok((patient, created))
}

pub fn find_by_national_id(conn: &Connection, national_id: &str) -> Result<Patient, IntakeError> {
    repository::get_patient_by_national_id(conn, national_id)?
        .ok_or_else(|| IntakeError::not_found("patient", national_id))
}

/// Newest registrations first.
pub fn list_paginated(conn: &Connection, page: &PageRequest) -> Result<Page<Patient>, IntakeError> {
    Ok(repository::list_patients(conn, page)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::{open_memory_database, Store};
    use crate::models::PatientInfo;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn input(national_id: &str, name: &str) -> NewPatient {
        NewPatient {
            info: PatientInfo {
                national_id: national_id.into(),
                full_name: name.into(),
                ..Default::default()
            },
            ktp_images: vec![],
        }
    }

    #[test]
    fn upsert_twice_keeps_one_patient_with_latest_fields() {
        let conn = open_memory_database().unwrap();
        let (first, created_first) = resolve_or_upsert(&conn, &input("1", "A")).unwrap();
        let (second, created_second) = resolve_or_upsert(&conn, &input("1", "B")).unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.id, second.id);
        assert_eq!(second.info.full_name, "B");
        assert_eq!(find_by_national_id(&conn, "1").unwrap().info.full_name, "B");

        let page = list_paginated(&conn, &PageRequest::new(1, 10).unwrap()).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn empty_national_id_is_a_validation_error() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            resolve_or_upsert(&conn, &input("", "Nobody")),
            Err(IntakeError::Validation(_))
        ));
        assert!(matches!(
            resolve_or_upsert(&conn, &input("   ", "Nobody")),
            Err(IntakeError::Validation(_))
        ));
        assert!(matches!(
            resolve_or_upsert(&conn, &input(" 12 ", "Nobody")),
            Err(IntakeError::Validation(_))
        ));
    }

    #[test]
    fn unknown_national_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            find_by_national_id(&conn, "404"),
            Err(IntakeError::NotFound { .. })
        ));
    }

    #[test]
    fn concurrent_first_registrations_create_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("intake.db"), Duration::from_secs(10)).unwrap();
        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));

        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let conn = store.connect(store.deadline()).unwrap();
                    barrier.wait();
                    resolve_or_upsert(&conn, &input("3201999", &format!("Worker {i}"))).unwrap()
                })
            })
            .collect();

        let results: Vec<(Patient, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: HashSet<_> = results.iter().map(|(p, _)| p.id).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);

        let conn = store.connect(store.deadline()).unwrap();
        let page = list_paginated(&conn, &PageRequest::new(1, 10).unwrap()).unwrap();
        assert_eq!(page.total, 1);
    }
}
