//! Walk-in screening: register (or refresh) the patient, give a first-time
//! patient an account, store the answers and queue the patient, all or
//! nothing.

use std::sync::Arc;

use rusqlite::{Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::{self, Provisioning};
use crate::crypto::PasswordHasher;
use crate::db::{repository, Deadline, Store};
use crate::error::IntakeError;
use crate::models::{AnswerItem, NewPatient, Patient, QueueEntry, ScreeningAnswer};
use crate::notify::Notifier;
use crate::registry;

use super::{intake, queue};

#[derive(Debug, Clone, Deserialize)]
pub struct WalkInRequest {
    pub patient: NewPatient,
    #[serde(default)]
    pub answers: Vec<AnswerItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkInOutcome {
    pub patient: Patient,
    pub patient_created: bool,
    /// Set only when this walk-in created the patient's account.
    pub account_id: Option<Uuid>,
    pub answer: ScreeningAnswer,
    pub queue_entry: QueueEntry,
}

/// Runs the walk-in use case against its own connection.
#[derive(Clone)]
pub struct ScreeningWorkflow {
    store: Store,
    hasher: Arc<dyn PasswordHasher>,
    notifier: Arc<dyn Notifier>,
}

impl ScreeningWorkflow {
    pub fn new(store: Store, hasher: Arc<dyn PasswordHasher>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            hasher,
            notifier,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    /// Upsert patient, provision an account for a new patient, store the
    /// answers and enqueue, in one `BEGIN IMMEDIATE` transaction.
    ///
    /// The account password is generated and hashed before the transaction
    /// opens, when a plain read shows the national ID is not registered yet,
    /// so the hashing cost never holds the write lock. The first failing
    /// step aborts the whole transaction and its error is returned as is.
    /// Credentials are sent only after the commit. Retrying after a lost
    /// response creates a second answer and queue entry.
    pub fn run_walk_in_screening(
        &self,
        deadline: Deadline,
        request: &WalkInRequest,
    ) -> Result<WalkInOutcome, IntakeError> {
        let conn = self.store.connect(deadline)?;

        let national_id = &request.patient.info.national_id;
        let pending = if repository::get_patient_by_national_id(&conn, national_id)?.is_none() {
            Some(accounts::prepare_account(self.hasher.as_ref(), &request.patient.info)?)
        } else {
            None
        };

        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

        let (patient, patient_created) = registry::resolve_or_upsert(&tx, &request.patient)?;
        let provisioning = if patient_created {
            let pending = match pending {
                Some(pending) => pending,
                // Only reachable if the patient row vanished after the read.
                None => accounts::prepare_account(self.hasher.as_ref(), &patient.info)?,
            };
            accounts::provision_if_absent(&tx, pending)?
        } else {
            Provisioning::AlreadyProvisioned
        };
        let answer = intake::submit(&tx, &patient.info, request.answers.clone())?;
        let queue_entry = queue::enqueue(&tx, &answer.patient_info, &answer.id)?;

        tx.commit()?;

        tracing::info!(
            patient_id = %patient.id,
            patient_created,
            entry_id = %queue_entry.id,
            "Walk-in screening recorded"
        );

        let account_id = provisioning.account_id();
        if let Provisioning::Created { credentials, .. } = &provisioning {
            accounts::send_credentials(self.notifier.as_ref(), credentials);
        }

        Ok(WalkInOutcome {
            patient,
            patient_created,
            account_id,
            answer,
            queue_entry,
        })
    }
}
