//! Named, durable, strictly increasing counters.
//!
//! A value handed out is never handed out again, even when the caller's
//! own work fails afterwards. Gaps are allowed.

use rusqlite::Connection;

use crate::db::repository;
use crate::error::IntakeError;

pub const MEDICAL_RECORD_COUNTER: &str = "medical_record";

/// Allocate the next value of `name`, creating the counter at 1.
pub fn next_value(conn: &Connection, name: &str) -> Result<i64, IntakeError> {
    validate_name(name)?;
    Ok(repository::next_sequence(conn, name)?)
}

/// Last value handed out, or `None` before the first allocation.
pub fn current_value(conn: &Connection, name: &str) -> Result<Option<i64>, IntakeError> {
    validate_name(name)?;
    Ok(repository::current_sequence(conn, name)?)
}

fn validate_name(name: &str) -> Result<(), IntakeError> {
    if name.trim().is_empty() {
        return Err(IntakeError::Validation("counter name is required".into()));
    }
    Ok(())
}
