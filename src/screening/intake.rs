use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{self, now};
use crate::error::IntakeError;
use crate::models::{AnswerCorrection, AnswerItem, PatientInfo, ScreeningAnswer};

/// Persist a submitted answer set together with the patient snapshot it
/// was submitted for. Both are stored exactly as given.
pub fn submit(
    conn: &Connection,
    snapshot: &PatientInfo,
    answers: Vec<AnswerItem>,
) -> Result<ScreeningAnswer, IntakeError> {
    let answer = ScreeningAnswer {
        id: Uuid::new_v4(),
        patient_info: snapshot.clone(),
        answers,
        created_at: now(),
    };
    repository::insert_screening_answer(conn, &answer)?;
    tracing::info!(answer_id = %answer.id, items = answer.answers.len(), "Screening answers stored");
    Ok(answer)
}

/// Administrative correction. Only the answer list can change; the
/// snapshot and submission time stay as submitted.
pub fn correct(conn: &Connection, id: &Uuid, correction: AnswerCorrection) -> Result<(), IntakeError> {
    let Some(answers) = correction.answers else {
        return Err(IntakeError::Validation("correction contains no changes".into()));
    };
    if !repository::replace_screening_answers(conn, id, &answers)? {
        return Err(IntakeError::not_found("screening answer", id));
    }
    tracing::info!(answer_id = %id, "Screening answers corrected");
    Ok(())
}

pub fn find(conn: &Connection, id: &Uuid) -> Result<ScreeningAnswer, IntakeError> {
    repository::get_screening_answer(conn, id)?.ok_or_else(|| IntakeError::not_found("screening answer", id))
}

/// Every answer set submitted under `national_id`, newest first.
pub fn history(conn: &Connection, national_id: &str) -> Result<Vec<ScreeningAnswer>, IntakeError> {
    if national_id.trim().is_empty() {
        return Err(IntakeError::Validation("national_id is required".into()));
    }
    Ok(repository::get_screening_answers_for_national_id(conn, national_id)?)
}
