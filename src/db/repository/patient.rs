use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, now, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, national_id, full_name, birth_place, birth_date, gender, address,
    rt, rw, village, district, religion, marital, job, nationality, valid_until, blood_type,
    height, weight, age, email, phone, ktp_images, created_at, updated_at";

/// Insert the patient, or overwrite every non-key field of the row that
/// already holds `national_id`. One statement, so two concurrent callers
/// with the same national ID can never both insert.
///
/// Returns the stored row and whether it was created by this call.
pub fn upsert_patient_by_national_id(
    conn: &Connection,
    patient: &NewPatient,
) -> Result<(Patient, bool), DatabaseError> {
    let candidate_id = Uuid::new_v4();
    let ts = format_timestamp(&now());
    let info = &patient.info;
    let images = serde_json::to_string(&patient.ktp_images)?;

    let sql = format!(
        "INSERT INTO patients ({PATIENT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?24)
         ON CONFLICT (national_id) DO UPDATE SET
             full_name = excluded.full_name,
             birth_place = excluded.birth_place,
             birth_date = excluded.birth_date,
             gender = excluded.gender,
             address = excluded.address,
             rt = excluded.rt,
             rw = excluded.rw,
             village = excluded.village,
             district = excluded.district,
             religion = excluded.religion,
             marital = excluded.marital,
             job = excluded.job,
             nationality = excluded.nationality,
             valid_until = excluded.valid_until,
             blood_type = excluded.blood_type,
             height = excluded.height,
             weight = excluded.weight,
             age = excluded.age,
             email = excluded.email,
             phone = excluded.phone,
             ktp_images = excluded.ktp_images,
             updated_at = excluded.updated_at
         RETURNING {PATIENT_COLUMNS}"
    );

    let row = conn.query_row(
        &sql,
        params![
            candidate_id.to_string(),
            info.national_id,
            info.full_name,
            info.birth_place,
            info.birth_date,
            info.gender,
            info.address,
            info.rt,
            info.rw,
            info.village,
            info.district,
            info.religion,
            info.marital,
            info.job,
            info.nationality,
            info.valid_until,
            info.blood_type,
            info.height,
            info.weight,
            info.age,
            info.email,
            info.phone,
            images,
            ts,
        ],
        patient_row_from_rusqlite,
    )?;

    let stored = patient_from_row(row)?;
    let created = stored.id == candidate_id;
    Ok((stored, created))
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], patient_row_from_rusqlite)
        .optional()?
        .map(patient_from_row)
        .transpose()
}

pub fn get_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1");
    conn.query_row(&sql, params![national_id], patient_row_from_rusqlite)
        .optional()?
        .map(patient_from_row)
        .transpose()
}

/// Newest registrations first.
pub fn list_patients(conn: &Connection, page: &PageRequest) -> Result<Page<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         ORDER BY created_at DESC, id
         LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![page.page_size(), page.offset()], patient_row_from_rusqlite)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(patient_from_row(row?)?);
    }

    let total: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        page_size: page.page_size(),
    })
}

struct PatientRow {
    id: String,
    info: PatientInfo,
    ktp_images: String,
    created_at: String,
    updated_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        info: PatientInfo {
            national_id: row.get(1)?,
            full_name: row.get(2)?,
            birth_place: row.get(3)?,
            birth_date: row.get(4)?,
            gender: row.get(5)?,
            address: row.get(6)?,
            rt: row.get(7)?,
            rw: row.get(8)?,
            village: row.get(9)?,
            district: row.get(10)?,
            religion: row.get(11)?,
            marital: row.get(12)?,
            job: row.get(13)?,
            nationality: row.get(14)?,
            valid_until: row.get(15)?,
            blood_type: row.get(16)?,
            height: row.get(17)?,
            weight: row.get(18)?,
            age: row.get(19)?,
            email: row.get(20)?,
            phone: row.get(21)?,
        },
        ktp_images: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid("patients", &row.id)?,
        info: row.info,
        ktp_images: serde_json::from_str(&row.ktp_images)?,
        created_at: parse_timestamp("patients", &row.created_at)?,
        updated_at: parse_timestamp("patients", &row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn new_patient(national_id: &str, name: &str) -> NewPatient {
        NewPatient {
            info: PatientInfo {
                national_id: national_id.into(),
                full_name: name.into(),
                email: format!("{name}@example.com").to_lowercase(),
                height: 170,
                ..Default::default()
            },
            ktp_images: vec!["uploads/ktp/front.jpg".into()],
        }
    }

    #[test]
    fn first_upsert_inserts() {
        let conn = open_memory_database().unwrap();
        let (patient, created) =
            upsert_patient_by_national_id(&conn, &new_patient("3201", "Siti")).unwrap();

        assert!(created);
        assert_eq!(patient.national_id(), "3201");
        assert_eq!(patient.ktp_images, vec!["uploads/ktp/front.jpg".to_string()]);
        assert_eq!(patient.created_at, patient.updated_at);
    }

    #[test]
    fn second_upsert_overwrites_and_keeps_identity() {
        let conn = open_memory_database().unwrap();
        let (first, _) = upsert_patient_by_national_id(&conn, &new_patient("1", "A")).unwrap();

        let mut second_input = new_patient("1", "B");
        second_input.ktp_images.clear();
        second_input.info.height = 0;
        let (second, created) = upsert_patient_by_national_id(&conn, &second_input).unwrap();

        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.info.full_name, "B");
        assert_eq!(second.info.height, 0);
        assert!(second.ktp_images.is_empty());
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_national_id_is_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        let result = upsert_patient_by_national_id(&conn, &new_patient("", "Nobody"));
        assert!(result.is_err());
    }

    #[test]
    fn lookup_by_national_id_and_id() {
        let conn = open_memory_database().unwrap();
        let (stored, _) = upsert_patient_by_national_id(&conn, &new_patient("77", "Budi")).unwrap();

        let by_nid = get_patient_by_national_id(&conn, "77").unwrap().unwrap();
        assert_eq!(by_nid.id, stored.id);
        let by_id = get_patient(&conn, &stored.id).unwrap().unwrap();
        assert_eq!(by_id.info, stored.info);

        assert!(get_patient_by_national_id(&conn, "78").unwrap().is_none());
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_pages_newest_first() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            upsert_patient_by_national_id(&conn, &new_patient(&format!("nid-{i}"), &format!("P{i}")))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let first = list_patients(&conn, &PageRequest::new(1, 2).unwrap()).unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].national_id(), "nid-4");
        assert_eq!(first.items[1].national_id(), "nid-3");

        let last = list_patients(&conn, &PageRequest::new(3, 2).unwrap()).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].national_id(), "nid-0");

        let beyond = list_patients(&conn, &PageRequest::new(4, 2).unwrap()).unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 5);
    }
}
