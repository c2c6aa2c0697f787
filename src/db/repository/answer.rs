use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

/// Store the snapshot and answers as JSON, verbatim.
pub fn insert_screening_answer(conn: &Connection, answer: &ScreeningAnswer) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO screening_answers (id, national_id, patient_info, answers, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            answer.id.to_string(),
            answer.patient_info.national_id,
            serde_json::to_string(&answer.patient_info)?,
            serde_json::to_string(&answer.answers)?,
            format_timestamp(&answer.created_at),
        ],
    )?;
    Ok(())
}

/// Replace the answer list. Returns `false` when no answer has this id.
pub fn replace_screening_answers(
    conn: &Connection,
    id: &Uuid,
    answers: &[AnswerItem],
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE screening_answers SET answers = ?1 WHERE id = ?2",
        params![serde_json::to_string(answers)?, id.to_string()],
    )?;
    Ok(updated > 0)
}

pub fn get_screening_answer(conn: &Connection, id: &Uuid) -> Result<Option<ScreeningAnswer>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_info, answers, created_at FROM screening_answers WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(AnswerRow {
                id: row.get(0)?,
                patient_info: row.get(1)?,
                answers: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .map(answer_from_row)
    .transpose()
}

pub fn get_screening_answers_for_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Vec<ScreeningAnswer>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_info, answers, created_at FROM screening_answers
         WHERE national_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![national_id], |row| {
        Ok(AnswerRow {
            id: row.get(0)?,
            patient_info: row.get(1)?,
            answers: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut answers = Vec::new();
    for row in rows {
        answers.push(answer_from_row(row?)?);
    }
    Ok(answers)
}

struct AnswerRow {
    id: String,
    patient_info: String,
    answers: String,
    created_at: String,
}

fn answer_from_row(row: AnswerRow) -> Result<ScreeningAnswer, DatabaseError> {
    Ok(ScreeningAnswer {
        id: parse_uuid("screening_answers", &row.id)?,
        patient_info: serde_json::from_str(&row.patient_info)?,
        answers: serde_json::from_str(&row.answers)?,
        created_at: parse_timestamp("screening_answers", &row.created_at)?,
    })
}
