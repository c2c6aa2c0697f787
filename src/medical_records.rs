//! Medical record numbers: one per patient, issued from the
//! `medical_record` counter.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{self, now};
use crate::error::IntakeError;
use crate::models::MedicalRecord;
use crate::sequence::{self, MEDICAL_RECORD_COUNTER};

/// `MR` followed by the counter value, zero-padded to four digits.
pub fn format_mr_number(seq: i64) -> String {
    format!("MR{seq:04}")
}

/// Return the patient's medical record, creating it on first request.
///
/// The counter value is allocated before the insert and is not given back
/// if another request creates the record first; that leaves a gap in the
/// numbering but never a duplicate.
pub fn create_for_patient(conn: &Connection, patient_id: &Uuid) -> Result<MedicalRecord, IntakeError> {
    if let Some(existing) = repository::get_medical_record_by_patient(conn, patient_id)? {
        return Ok(existing);
    }
    if repository::get_patient(conn, patient_id)?.is_none() {
        return Err(IntakeError::not_found("patient", patient_id));
    }

    let seq = sequence::next_value(conn, MEDICAL_RECORD_COUNTER)?;
    let record = MedicalRecord {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        mr_number: format_mr_number(seq),
        created_at: now(),
    };

    if repository::insert_medical_record_if_absent(conn, &record)? {
        tracing::info!(patient_id = %patient_id, mr_number = %record.mr_number, "Medical record created");
        return Ok(record);
    }

    tracing::debug!(patient_id = %patient_id, skipped = seq, "Medical record created concurrently");
    find_by_patient(conn, patient_id)
}

pub fn find_by_patient(conn: &Connection, patient_id: &Uuid) -> Result<MedicalRecord, IntakeError> {
    repository::get_medical_record_by_patient(conn, patient_id)?
        .ok_or_else(|| IntakeError::not_found("medical record", patient_id))
}

pub fn find_by_number(conn: &Connection, mr_number: &str) -> Result<MedicalRecord, IntakeError> {
    repository::get_medical_record_by_number(conn, mr_number)?
        .ok_or_else(|| IntakeError::not_found("medical record", mr_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::{open_memory_database, Store};
    use crate::models::{NewPatient, PatientInfo};
    use crate::registry;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn register(conn: &Connection, national_id: &str) -> Uuid {
        let input = NewPatient {
            info: PatientInfo {
                national_id: national_id.into(),
                ..Default::default()
            },
            ktp_images: vec![],
        };
        registry::resolve_or_upsert(conn, &input).unwrap().0.id
    }

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(format_mr_number(1), "MR0001");
        assert_eq!(format_mr_number(42), "MR0042");
        assert_eq!(format_mr_number(12345), "MR12345");
    }

    #[test]
    fn creation_is_idempotent_per_patient() {
        let conn = open_memory_database().unwrap();
        let a = register(&conn, "1");
        let b = register(&conn, "2");

        let first = create_for_patient(&conn, &a).unwrap();
        let again = create_for_patient(&conn, &a).unwrap();
        let other = create_for_patient(&conn, &b).unwrap();

        assert_eq!(first, again);
        assert_eq!(first.mr_number, "MR0001");
        assert_eq!(other.mr_number, "MR0002");
        assert_eq!(find_by_number(&conn, "MR0002").unwrap().patient_id, b);
        assert_eq!(find_by_patient(&conn, &a).unwrap().id, first.id);
    }

    #[test]
    fn unknown_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            create_for_patient(&conn, &Uuid::new_v4()),
            Err(IntakeError::NotFound { .. })
        ));
        assert_eq!(sequence::current_value(&conn, MEDICAL_RECORD_COUNTER).unwrap(), None);
        assert!(matches!(find_by_number(&conn, "MR0001"), Err(IntakeError::NotFound { .. })));
    }

    #[test]
    fn concurrent_requests_agree_on_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("intake.db"), Duration::from_secs(10)).unwrap();
        let patient_id = {
            let conn = store.connect(store.deadline()).unwrap();
            register(&conn, "3201")
        };

        let workers = 6;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let conn = store.connect(store.deadline()).unwrap();
                    barrier.wait();
                    create_for_patient(&conn, &patient_id).unwrap()
                })
            })
            .collect();

        let records: Vec<MedicalRecord> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(records.iter().all(|r| r == &records[0]));
    }
}
