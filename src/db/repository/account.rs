use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::AccountRole;
use crate::models::Account;

/// Insert the account unless one already exists for its national ID.
///
/// Returns `true` when this call created the row. A concurrent caller that
/// loses the race gets `false` instead of an error. An email already taken
/// by another national ID still fails with a UNIQUE violation.
pub fn insert_account_if_absent(conn: &Connection, account: &Account) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO accounts (id, email, password_hash, role, national_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (national_id) DO NOTHING",
        params![
            account.id.to_string(),
            account.email,
            account.password_hash,
            account.role.as_str(),
            account.national_id,
            format_timestamp(&account.created_at),
        ],
    )?;
    Ok(inserted == 1)
}

pub fn get_account_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Account>, DatabaseError> {
    conn.query_row(
        "SELECT id, email, password_hash, role, national_id, created_at
         FROM accounts WHERE national_id = ?1",
        params![national_id],
        account_row_from_rusqlite,
    )
    .optional()?
    .map(account_from_row)
    .transpose()
}

pub fn get_account_by_email(conn: &Connection, email: &str) -> Result<Option<Account>, DatabaseError> {
    conn.query_row(
        "SELECT id, email, password_hash, role, national_id, created_at
         FROM accounts WHERE email = ?1",
        params![email],
        account_row_from_rusqlite,
    )
    .optional()?
    .map(account_from_row)
    .transpose()
}

pub fn count_accounts(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    Ok(count)
}

struct AccountRow {
    id: String,
    email: String,
    password_hash: String,
    role: String,
    national_id: Option<String>,
    created_at: String,
}

fn account_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AccountRow, rusqlite::Error> {
    Ok(AccountRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        national_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn account_from_row(row: AccountRow) -> Result<Account, DatabaseError> {
    Ok(Account {
        id: parse_uuid("accounts", &row.id)?,
        email: row.email,
        password_hash: row.password_hash,
        role: AccountRole::from_str(&row.role)?,
        national_id: row.national_id,
        created_at: parse_timestamp("accounts", &row.created_at)?,
    })
}
