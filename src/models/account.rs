use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::AccountRole;

/// Login identity. Patient accounts are tied to one national ID; staff
/// accounts carry none.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AccountRole,
    pub national_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
