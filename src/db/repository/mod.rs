//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a plain `&Connection` so it works the same on an
//! autocommit connection and inside a `Transaction` opened by a caller.
//! Writes that must be atomic are expressed as a single statement.

mod account;
mod answer;
mod counter;
mod medical_record;
mod patient;
mod question;
mod queue;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use account::*;
pub use answer::*;
pub use counter::*;
pub use medical_record::*;
pub use patient::*;
pub use question::*;
pub use queue::*;

/// Fixed-width UTC timestamp so lexical order in SQLite equals time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table,
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}

pub(crate) fn parse_uuid(table: &'static str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::CorruptRow {
        table,
        reason: format!("bad id {raw:?}: {e}"),
    })
}

/// Current time truncated to the stored precision.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    let micros = now.timestamp_micros();
    DateTime::from_timestamp_micros(micros).unwrap_or(now)
}
