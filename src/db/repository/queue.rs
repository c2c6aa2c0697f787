use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, now, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::QueueStatus;
use crate::models::*;

/// Compare-and-swap attempts before giving up on a hot entry.
const STATUS_UPDATE_ATTEMPTS: usize = 16;

const QUEUE_COLUMNS: &str =
    "id, patient_info, screening_answer_id, status, created_at, updated_at";

/// Result of a conditional status change.
#[derive(Debug)]
pub enum StatusChange {
    Updated(QueueEntry),
    /// The entry exists but its current status does not allow the move.
    Rejected { current: QueueStatus },
    Missing,
}

/// Insert a `screening_pending` entry, but only if the referenced answer
/// exists. The existence check and the insert are one statement.
///
/// Returns `None` when no answer has `answer_id`.
pub fn insert_queue_entry(
    conn: &Connection,
    snapshot: &PatientInfo,
    answer_id: &Uuid,
) -> Result<Option<QueueEntry>, DatabaseError> {
    let id = Uuid::new_v4();
    let ts = format_timestamp(&now());

    let inserted = conn.execute(
        "INSERT INTO screening_queue
             (id, national_id, patient_info, screening_answer_id, status, created_at, updated_at)
         SELECT ?1, ?2, ?3, a.id, ?4, ?5, ?5
         FROM screening_answers a WHERE a.id = ?6",
        params![
            id.to_string(),
            snapshot.national_id,
            serde_json::to_string(snapshot)?,
            QueueStatus::ScreeningPending.as_str(),
            ts,
            answer_id.to_string(),
        ],
    )?;

    if inserted == 0 {
        return Ok(None);
    }
    get_queue_entry(conn, &id)
}

pub fn get_queue_entry(conn: &Connection, id: &Uuid) -> Result<Option<QueueEntry>, DatabaseError> {
    let sql = format!("SELECT {QUEUE_COLUMNS} FROM screening_queue WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], queue_row_from_rusqlite)
        .optional()?
        .map(queue_entry_from_row)
        .transpose()
}

/// Move the entry to `next` if its current status can advance to it.
///
/// Each attempt reads the entry and then updates it only if neither status
/// nor `updated_at` moved in between. A failed rejection leaves the row
/// untouched. `updated_at` becomes the later of now and one microsecond
/// past the previous value.
pub fn update_queue_status(
    conn: &Connection,
    id: &Uuid,
    next: QueueStatus,
) -> Result<StatusChange, DatabaseError> {
    for _ in 0..STATUS_UPDATE_ATTEMPTS {
        let Some(current) = get_queue_entry(conn, id)? else {
            return Ok(StatusChange::Missing);
        };
        if !current.status.can_advance_to(next) {
            return Ok(StatusChange::Rejected {
                current: current.status,
            });
        }

        let updated_at = advance(&current.updated_at);
        let sql = format!(
            "UPDATE screening_queue SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND status = ?4 AND updated_at = ?5
             RETURNING {QUEUE_COLUMNS}"
        );
        let row = conn
            .query_row(
                &sql,
                params![
                    next.as_str(),
                    format_timestamp(&updated_at),
                    id.to_string(),
                    current.status.as_str(),
                    format_timestamp(&current.updated_at),
                ],
                queue_row_from_rusqlite,
            )
            .optional()?;

        if let Some(row) = row {
            return Ok(StatusChange::Updated(queue_entry_from_row(row)?));
        }
        tracing::debug!(entry = %id, "Queue entry changed concurrently, retrying");
    }

    Err(DatabaseError::ConstraintViolation(format!(
        "queue entry {id} kept changing during status update"
    )))
}

/// One page of entries in `status`. Waiting entries come oldest-first,
/// the others newest-first.
pub fn list_queue_by_status(
    conn: &Connection,
    status: QueueStatus,
    page: &PageRequest,
) -> Result<Page<QueueEntry>, DatabaseError> {
    let order = if status.lists_oldest_first() {
        "created_at ASC, id ASC"
    } else {
        "created_at DESC, id DESC"
    };
    let sql = format!(
        "SELECT {QUEUE_COLUMNS} FROM screening_queue
         WHERE status = ?1
         ORDER BY {order}
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![status.as_str(), page.page_size(), page.offset()],
        queue_row_from_rusqlite,
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(queue_entry_from_row(row?)?);
    }

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM screening_queue WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        page_size: page.page_size(),
    })
}

fn advance(previous: &DateTime<Utc>) -> DateTime<Utc> {
    let floor = *previous + Duration::microseconds(1);
    now().max(floor)
}

struct QueueRow {
    id: String,
    patient_info: String,
    screening_answer_id: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn queue_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<QueueRow, rusqlite::Error> {
    Ok(QueueRow {
        id: row.get(0)?,
        patient_info: row.get(1)?,
        screening_answer_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn queue_entry_from_row(row: QueueRow) -> Result<QueueEntry, DatabaseError> {
    Ok(QueueEntry {
        id: parse_uuid("screening_queue", &row.id)?,
        patient_info: serde_json::from_str(&row.patient_info)?,
        screening_answer_id: parse_uuid("screening_queue", &row.screening_answer_id)?,
        status: QueueStatus::from_str(&row.status)?,
        created_at: parse_timestamp("screening_queue", &row.created_at)?,
        updated_at: parse_timestamp("screening_queue", &row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_screening_answer;
    use crate::db::sqlite::open_memory_database;

    fn snapshot(national_id: &str) -> PatientInfo {
        PatientInfo {
            national_id: national_id.into(),
            full_name: "Dewi".into(),
            ..Default::default()
        }
    }

    fn stored_answer(conn: &Connection, national_id: &str) -> Uuid {
        let answer = ScreeningAnswer {
            id: Uuid::new_v4(),
            patient_info: snapshot(national_id),
            answers: vec![],
            created_at: now(),
        };
        insert_screening_answer(conn, &answer).unwrap();
        answer.id
    }

    fn count_entries(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM screening_queue", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn enqueue_starts_pending() {
        let conn = open_memory_database().unwrap();
        let answer_id = stored_answer(&conn, "1");

        let entry = insert_queue_entry(&conn, &snapshot("1"), &answer_id)
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, QueueStatus::ScreeningPending);
        assert_eq!(entry.screening_answer_id, answer_id);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn enqueue_without_answer_creates_nothing() {
        let conn = open_memory_database().unwrap();
        assert!(insert_queue_entry(&conn, &snapshot("1"), &Uuid::new_v4())
            .unwrap()
            .is_none());
        assert!(insert_queue_entry(&conn, &snapshot("1"), &Uuid::nil())
            .unwrap()
            .is_none());
        assert_eq!(count_entries(&conn), 0);
    }

    #[test]
    fn status_moves_forward_and_timestamp_advances() {
        let conn = open_memory_database().unwrap();
        let answer_id = stored_answer(&conn, "1");
        let entry = insert_queue_entry(&conn, &snapshot("1"), &answer_id)
            .unwrap()
            .unwrap();

        let StatusChange::Updated(started) =
            update_queue_status(&conn, &entry.id, QueueStatus::InProgress).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(started.status, QueueStatus::InProgress);
        assert!(started.updated_at > entry.updated_at);
        assert_eq!(started.created_at, entry.created_at);

        let StatusChange::Updated(finished) =
            update_queue_status(&conn, &entry.id, QueueStatus::Done).unwrap()
        else {
            panic!("expected update");
        };
        assert!(finished.updated_at > started.updated_at);
    }

    #[test]
    fn backward_move_is_rejected_and_row_untouched() {
        let conn = open_memory_database().unwrap();
        let answer_id = stored_answer(&conn, "1");
        let entry = insert_queue_entry(&conn, &snapshot("1"), &answer_id)
            .unwrap()
            .unwrap();
        update_queue_status(&conn, &entry.id, QueueStatus::Done).unwrap();
        let before = get_queue_entry(&conn, &entry.id).unwrap().unwrap();

        let result = update_queue_status(&conn, &entry.id, QueueStatus::InProgress).unwrap();
        assert!(matches!(
            result,
            StatusChange::Rejected { current: QueueStatus::Done }
        ));

        let after = get_queue_entry(&conn, &entry.id).unwrap().unwrap();
        assert_eq!(after.status, QueueStatus::Done);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn unknown_entry_is_missing() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            update_queue_status(&conn, &Uuid::new_v4(), QueueStatus::Done).unwrap(),
            StatusChange::Missing
        ));
    }

    #[test]
    fn listing_orders_by_status() {
        let conn = open_memory_database().unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let nid = format!("nid-{i}");
            let answer_id = stored_answer(&conn, &nid);
            let entry = insert_queue_entry(&conn, &snapshot(&nid), &answer_id)
                .unwrap()
                .unwrap();
            ids.push(entry.id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        for id in &ids {
            update_queue_status(&conn, id, QueueStatus::Done).unwrap();
        }
        let answer_id = stored_answer(&conn, "late");
        let waiting_a = insert_queue_entry(&conn, &snapshot("late"), &answer_id)
            .unwrap()
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let waiting_b = insert_queue_entry(&conn, &snapshot("late"), &answer_id)
            .unwrap()
            .unwrap();

        let all = PageRequest::new(1, 10).unwrap();
        let done = list_queue_by_status(&conn, QueueStatus::Done, &all).unwrap();
        assert_eq!(done.total, 3);
        assert_eq!(done.items[0].id, ids[2]);
        assert_eq!(done.items[2].id, ids[0]);

        let pending = list_queue_by_status(&conn, QueueStatus::ScreeningPending, &all).unwrap();
        assert_eq!(pending.total, 2);
        assert_eq!(pending.items[0].id, waiting_a.id);
        assert_eq!(pending.items[1].id, waiting_b.id);

        let in_progress = list_queue_by_status(&conn, QueueStatus::InProgress, &all).unwrap();
        assert_eq!(in_progress.total, 0);
        assert!(in_progress.items.is_empty());
    }
}
