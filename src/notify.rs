//! Outbound notifications to patients.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a short message to an email address.
pub trait Notifier: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes the notification to the log instead of sending it. The body is
/// left out since it may carry credentials.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if !to.contains('@') {
            return Err(NotifyError::InvalidRecipient(to.to_string()));
        }
        tracing::info!(to = %to, subject = %subject, body_len = body.len(), "Notification dispatched");
        Ok(())
    }
}
