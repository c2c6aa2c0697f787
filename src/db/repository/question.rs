use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::QuestionType;
use crate::models::ScreeningQuestion;

/// Append the question after the current last one.
pub fn insert_question(conn: &Connection, question: &ScreeningQuestion) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO screening_questions (id, position, label, question_type, options)
         SELECT ?1, COALESCE(MAX(position), 0) + 1, ?2, ?3, ?4 FROM screening_questions",
        params![
            question.id.to_string(),
            question.label,
            question.question_type.as_str(),
            serde_json::to_string(&question.options)?,
        ],
    )?;
    Ok(())
}

/// Overwrite label, type and options. Returns `false` when the id is unknown.
pub fn update_question(conn: &Connection, question: &ScreeningQuestion) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE screening_questions SET label = ?1, question_type = ?2, options = ?3
         WHERE id = ?4",
        params![
            question.label,
            question.question_type.as_str(),
            serde_json::to_string(&question.options)?,
            question.id.to_string(),
        ],
    )?;
    Ok(updated > 0)
}

pub fn get_question(conn: &Connection, id: &Uuid) -> Result<Option<ScreeningQuestion>, DatabaseError> {
    conn.query_row(
        "SELECT id, label, question_type, options FROM screening_questions WHERE id = ?1",
        params![id.to_string()],
        question_row_from_rusqlite,
    )
    .optional()?
    .map(question_from_row)
    .transpose()
}

/// All questions in the order they were added.
pub fn list_questions(conn: &Connection) -> Result<Vec<ScreeningQuestion>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, label, question_type, options FROM screening_questions
         ORDER BY position, id",
    )?;
    let rows = stmt.query_map([], question_row_from_rusqlite)?;

    let mut questions = Vec::new();
    for row in rows {
        questions.push(question_from_row(row?)?);
    }
    Ok(questions)
}

pub fn count_questions(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM screening_questions", [], |row| row.get(0))?;
    Ok(count)
}

struct QuestionRow {
    id: String,
    label: String,
    question_type: String,
    options: String,
}

fn question_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<QuestionRow, rusqlite::Error> {
    Ok(QuestionRow {
        id: row.get(0)?,
        label: row.get(1)?,
        question_type: row.get(2)?,
        options: row.get(3)?,
    })
}

fn question_from_row(row: QuestionRow) -> Result<ScreeningQuestion, DatabaseError> {
    Ok(ScreeningQuestion {
        id: parse_uuid("screening_questions", &row.id)?,
        label: row.label,
        question_type: QuestionType::from_str(&row.question_type)?,
        options: serde_json::from_str(&row.options)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn question(label: &str, question_type: QuestionType, options: &[&str]) -> ScreeningQuestion {
        ScreeningQuestion {
            id: Uuid::new_v4(),
            label: label.into(),
            question_type,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    #[test]
    fn list_keeps_insertion_order() {
        let conn = open_memory_database().unwrap();
        let labels = ["Tanggal keberangkatan", "Riwayat penyakit", "Obat rutin"];
        insert_question(&conn, &question(labels[0], QuestionType::Date, &[])).unwrap();
        insert_question(&conn, &question(labels[1], QuestionType::Checkbox, &["Asma", "Jantung"]))
            .unwrap();
        insert_question(&conn, &question(labels[2], QuestionType::Text, &[])).unwrap();

        let listed: Vec<String> = list_questions(&conn)
            .unwrap()
            .into_iter()
            .map(|q| q.label)
            .collect();
        assert_eq!(listed, labels);
        assert_eq!(count_questions(&conn).unwrap(), 3);
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = open_memory_database().unwrap();
        let mut q = question("Alergi?", QuestionType::Text, &[]);
        insert_question(&conn, &q).unwrap();

        q.question_type = QuestionType::Select;
        q.options = vec!["Ya".into(), "Tidak".into()];
        assert!(update_question(&conn, &q).unwrap());

        let stored = get_question(&conn, &q.id).unwrap().unwrap();
        assert_eq!(stored.question_type, QuestionType::Select);
        assert_eq!(stored.options, vec!["Ya".to_string(), "Tidak".to_string()]);
    }

    #[test]
    fn update_unknown_question_reports_missing() {
        let conn = open_memory_database().unwrap();
        let q = question("Ghost", QuestionType::Text, &[]);
        assert!(!update_question(&conn, &q).unwrap());
        assert!(get_question(&conn, &q.id).unwrap().is_none());
    }
}
