use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::MedicalRecord;

/// Insert unless the patient already has a record. Returns `true` when
/// this call created the row.
pub fn insert_medical_record_if_absent(
    conn: &Connection,
    record: &MedicalRecord,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO medical_records (id, patient_id, mr_number, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (patient_id) DO NOTHING",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.mr_number,
            format_timestamp(&record.created_at),
        ],
    )?;
    Ok(inserted == 1)
}

pub fn get_medical_record_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, mr_number, created_at FROM medical_records WHERE patient_id = ?1",
        params![patient_id.to_string()],
        medical_record_row_from_rusqlite,
    )
    .optional()?
    .map(medical_record_from_row)
    .transpose()
}

pub fn get_medical_record_by_number(
    conn: &Connection,
    mr_number: &str,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, mr_number, created_at FROM medical_records WHERE mr_number = ?1",
        params![mr_number],
        medical_record_row_from_rusqlite,
    )
    .optional()?
    .map(medical_record_from_row)
    .transpose()
}

struct MedicalRecordRow {
    id: String,
    patient_id: String,
    mr_number: String,
    created_at: String,
}

fn medical_record_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<MedicalRecordRow, rusqlite::Error> {
    Ok(MedicalRecordRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        mr_number: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn medical_record_from_row(row: MedicalRecordRow) -> Result<MedicalRecord, DatabaseError> {
    Ok(MedicalRecord {
        id: parse_uuid("medical_records", &row.id)?,
        patient_id: parse_uuid("medical_records", &row.patient_id)?,
        mr_number: row.mr_number,
        created_at: parse_timestamp("medical_records", &row.created_at)?,
    })
}
