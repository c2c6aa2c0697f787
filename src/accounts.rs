//! Login accounts for patients.
//!
//! An account is created at most once per national ID, either provisioned
//! on a first walk-in with a generated password or through
//! self-registration. A generated password only lives in memory until it
//! has been sent to the patient.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::PasswordHasher;
use crate::db::repository::{self, now};
use crate::error::IntakeError;
use crate::models::enums::AccountRole;
use crate::models::{Account, NewPatient, Patient, PatientInfo};
use crate::notify::Notifier;
use crate::registry;

pub const GENERATED_PASSWORD_LENGTH: usize = 10;
pub const MIN_PASSWORD_LENGTH: usize = 8;

const CREDENTIALS_SUBJECT: &str = "Akun Klinik Anda";

/// Plaintext login for a freshly provisioned account.
pub struct Credentials {
    pub email: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum Provisioning {
    Created { account_id: Uuid, credentials: Credentials },
    AlreadyProvisioned,
}

impl Provisioning {
    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Provisioning::Created { account_id, .. } => Some(*account_id),
            Provisioning::AlreadyProvisioned => None,
        }
    }
}

/// Random password over `[A-Za-z0-9]`.
pub fn generate_password() -> Zeroizing<String> {
    Zeroizing::new(
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSWORD_LENGTH)
            .map(char::from)
            .collect(),
    )
}

/// A patient account that has been validated and hashed but not stored.
///
/// Built outside any transaction so the PBKDF2 cost never runs under the
/// database write lock.
#[derive(Debug)]
pub struct PendingAccount {
    account: Account,
    credentials: Credentials,
}

/// Validate the snapshot's email and national ID, generate a password and
/// hash it.
pub fn prepare_account(
    hasher: &dyn PasswordHasher,
    snapshot: &PatientInfo,
) -> Result<PendingAccount, IntakeError> {
    if snapshot.national_id.trim().is_empty() {
        return Err(IntakeError::Validation("national ID is required".into()));
    }
    let email = normalize_email(&snapshot.email)?;

    let password = generate_password();
    let account = Account {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hasher.hash(&password),
        role: AccountRole::Patient,
        national_id: Some(snapshot.national_id.clone()),
        created_at: now(),
    };
    Ok(PendingAccount {
        account,
        credentials: Credentials { email, password },
    })
}

/// Store `pending` unless an account already exists for its national ID.
///
/// Safe under concurrency: the insert is conditional on the national ID, so
/// the loser of a race gets `AlreadyProvisioned`. An email address already
/// used by another person's account is a conflict.
pub fn provision_if_absent(
    conn: &Connection,
    pending: PendingAccount,
) -> Result<Provisioning, IntakeError> {
    let PendingAccount {
        account,
        credentials,
    } = pending;
    let Some(national_id) = account.national_id.as_deref() else {
        return Err(IntakeError::Validation("national ID is required".into()));
    };

    if repository::get_account_by_national_id(conn, national_id)?.is_some() {
        return Ok(Provisioning::AlreadyProvisioned);
    }

    if !insert_account(conn, &account)? {
        return Ok(Provisioning::AlreadyProvisioned);
    }

    tracing::info!(account_id = %account.id, "Patient account provisioned");
    Ok(Provisioning::Created {
        account_id: account.id,
        credentials,
    })
}

/// A self-registered patient and the account they log in with.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub patient: Patient,
    pub account: Account,
}

/// Patient self-registration with a password of their choosing.
///
/// The password is hashed first; the email check, account insert and
/// patient upsert then run in one `BEGIN IMMEDIATE` transaction on `conn`,
/// which must not already be inside one. An email or national ID that
/// already has an account is a conflict and leaves nothing behind.
pub fn register_patient(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    input: &NewPatient,
    password: &str,
) -> Result<Registration, IntakeError> {
    if input.info.national_id.trim().is_empty() {
        return Err(IntakeError::Validation("national ID is required".into()));
    }
    if input.info.full_name.trim().is_empty() {
        return Err(IntakeError::Validation("full name is required".into()));
    }
    let email = normalize_email(&input.info.email)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IntakeError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let account = Account {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hasher.hash(password),
        role: AccountRole::Patient,
        national_id: Some(input.info.national_id.clone()),
        created_at: now(),
    };
    let mut input = input.clone();
    input.info.email = email.clone();

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if repository::get_account_by_email(&tx, &email)?.is_some() {
        return Err(IntakeError::Conflict(format!("email {email} is already registered")));
    }
    if !insert_account(&tx, &account)? {
        return Err(IntakeError::Conflict(format!(
            "national ID {} already has an account",
            input.info.national_id
        )));
    }
    let (patient, _) = registry::resolve_or_upsert(&tx, &input)?;
    tx.commit()?;

    tracing::info!(account_id = %account.id, patient_id = %patient.id, "Patient self-registered");
    Ok(Registration { patient, account })
}

fn normalize_email(raw: &str) -> Result<String, IntakeError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(IntakeError::Validation(
            "a valid email address is required to create an account".into(),
        ));
    }
    Ok(email)
}

/// Conditional insert; `false` when the national ID already has an account.
fn insert_account(conn: &Connection, account: &Account) -> Result<bool, IntakeError> {
    repository::insert_account_if_absent(conn, account).map_err(|e| {
        if e.is_unique_violation() {
            IntakeError::Conflict(format!("email {} is already registered", account.email))
        } else {
            e.into()
        }
    })
}

/// Email the credentials. Failures are logged and swallowed: the account
/// exists either way.
pub fn send_credentials(notifier: &dyn Notifier, credentials: &Credentials) {
    let body = Zeroizing::new(format!(
        "Email: {}\nPassword: {}",
        credentials.email,
        credentials.password.as_str()
    ));
    if let Err(e) = notifier.send(&credentials.email, CREDENTIALS_SUBJECT, &body) {
        tracing::warn!(error = %e, "Failed to deliver account credentials");
    }
}

/// Check a login attempt. `None` when the email is unknown or the password
/// does not match.
pub fn verify_credentials(
    conn: &Connection,
    hasher: &dyn PasswordHasher,
    email: &str,
    password: &str,
) -> Result<Option<Account>, IntakeError> {
    let email = email.trim().to_lowercase();
    let Some(account) = repository::get_account_by_email(conn, &email)? else {
        // Same hashing cost as a wrong password for a known email.
        let _ = hasher.hash(password);
        return Ok(None);
    };
    if !hasher.verify(password, &account.password_hash) {
        return Ok(None);
    }
    Ok(Some(account))
}
