use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

/// Create the counter at 1 or bump it, and return the new value, in one
/// statement. Concurrent callers are serialized by the write lock, so no
/// two of them can read the same value.
pub fn next_sequence(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    let seq = conn.query_row(
        "INSERT INTO counters (name, seq) VALUES (?1, 1)
         ON CONFLICT (name) DO UPDATE SET seq = seq + 1
         RETURNING seq",
        params![name],
        |row| row.get(0),
    )?;
    Ok(seq)
}

pub fn current_sequence(conn: &Connection, name: &str) -> Result<Option<i64>, DatabaseError> {
    let seq = conn
        .query_row(
            "SELECT seq FROM counters WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(seq)
}
