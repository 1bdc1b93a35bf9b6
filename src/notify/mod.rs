//! Outbound email for journal entries.

use async_trait::async_trait;
use tracing::{error, instrument};

use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult};
use crate::export::render_text;
use crate::journal::repo_types::JournalEntry;

pub mod credentials;
pub mod gmail;

pub const ENTRY_SUBJECT: &str = "My Gratitude Journal Entry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn for_entry(from: &str, to: &str, entry: &JournalEntry) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: ENTRY_SUBJECT.to_string(),
            body: render_text(entry),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Address used in the `From` header.
    fn sender(&self) -> &str;
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Checked before any entry is looked up.
pub fn validate_recipient(recipient: &str) -> AppResult<&str> {
    let recipient = recipient.trim();
    if recipient.is_empty() {
        return Err(AppError::validation(
            "Please provide a recipient email address!",
        ));
    }
    if !is_valid_email(recipient) {
        return Err(AppError::validation("Please provide a valid email address!"));
    }
    Ok(recipient)
}

/// One message per entry, in order. Stops at the first failed delivery.
#[instrument(skip(mailer, entries), fields(count = entries.len()))]
pub async fn send_entries(
    mailer: &dyn Mailer,
    recipient: &str,
    entries: &[JournalEntry],
) -> AppResult<usize> {
    for entry in entries {
        let message = EmailMessage::for_entry(mailer.sender(), recipient, entry);
        if let Err(e) = mailer.send(&message).await {
            error!(error = %e, entry_id = %entry.id, "email delivery failed");
            return Err(AppError::ExternalService(format!(
                "Failed to send '{}': {}",
                entry.title, e
            )));
        }
    }
    Ok(entries.len())
}

/// Used when no mail credentials are configured.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    fn sender(&self) -> &str {
        "me"
    }

    async fn send(&self, _message: &EmailMessage) -> AppResult<()> {
        Err(AppError::ExternalService(
            "email delivery is not configured".into(),
        ))
    }
}

#[cfg(test)]
pub use recording::RecordingMailer;
