//! Intake queue: one entry per submitted screening, moved forward through
//! `screening_pending`, `in_progress` and `done`.

use std::str::FromStr;

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{self, StatusChange};
use crate::error::IntakeError;
use crate::models::enums::QueueStatus;
use crate::models::{Page, PageRequest, PatientInfo, QueueEntry};

/// Queue a submitted screening. The answer must already be stored.
pub fn enqueue(conn: &Connection, snapshot: &PatientInfo, answer_id: &Uuid) -> Result<QueueEntry, IntakeError> {
    if answer_id.is_nil() {
        return Err(IntakeError::Validation("screening answer id is required".into()));
    }
    let entry = repository::insert_queue_entry(conn, snapshot, answer_id)?.ok_or_else(|| {
        IntakeError::Validation(format!("screening answer {answer_id} does not exist"))
    })?;
    tracing::info!(entry_id = %entry.id, answer_id = %answer_id, "Patient queued for screening");
    Ok(entry)
}

/// Advance an entry. Rejections leave the entry exactly as it was.
pub fn update_status(conn: &Connection, id: &Uuid, new_status: &str) -> Result<QueueEntry, IntakeError> {
    let next = parse_status(new_status)?;
    match repository::update_queue_status(conn, id, next)? {
        StatusChange::Updated(entry) => {
            tracing::info!(entry_id = %id, status = %next, "Queue entry advanced");
            Ok(entry)
        }
        StatusChange::Rejected { current } => Err(IntakeError::InvalidStatus(format!(
            "cannot move queue entry from {current} to {next}"
        ))),
        StatusChange::Missing => Err(IntakeError::not_found("queue entry", id)),
    }
}

pub fn list_paginated(
    conn: &Connection,
    status: &str,
    page: &PageRequest,
) -> Result<Page<QueueEntry>, IntakeError> {
    let status = parse_status(status)?;
    Ok(repository::list_queue_by_status(conn, status, page)?)
}

pub fn find(conn: &Connection, id: &Uuid) -> Result<QueueEntry, IntakeError> {
    repository::get_queue_entry(conn, id)?.ok_or_else(|| IntakeError::not_found("queue entry", id))
}

fn parse_status(raw: &str) -> Result<QueueStatus, IntakeError> {
    QueueStatus::from_str(raw).map_err(|_| IntakeError::InvalidStatus(format!("unknown status {raw:?}")))
}
