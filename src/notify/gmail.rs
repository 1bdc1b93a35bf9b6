use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};
use crate::notify::{credentials::CredentialProvider, EmailMessage, Mailer};

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

/// RFC 5322 plain-text message.
pub fn to_rfc5322(message: &EmailMessage) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}",
        message.from,
        message.to,
        message.subject,
        message.body.replace("\r\n", "\n").replace('\n', "\r\n"),
    )
}

/// Sends through the Gmail REST API on behalf of the authorized account.
pub struct GmailMailer {
    client: Client,
    send_url: String,
    sender: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GmailMailer {
    pub fn new(config: &MailConfig, credentials: Arc<dyn CredentialProvider>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            send_url: config.send_url.clone(),
            sender: config.sender.clone(),
            credentials,
        })
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    fn sender(&self) -> &str {
        &self.sender
    }

    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let token = self.credentials.access_token().await?;
        let request = SendRequest {
            raw: URL_SAFE.encode(to_rfc5322(message)),
        };
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("email send failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "mail API returned status {}",
                response.status()
            )));
        }
        info!("email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_has_headers_and_crlf_body() {
        let msg = EmailMessage {
            from: "me".into(),
            to: "bob@example.com".into(),
            subject: "My Gratitude Journal Entry".into(),
            body: "Title: A\nDate: D\n\nText".into(),
        };
        let raw = to_rfc5322(&msg);
        assert!(raw.starts_with("From: me\r\nTo: bob@example.com\r\nSubject: My Gratitude Journal Entry\r\n"));
        assert!(raw.ends_with("\r\n\r\nTitle: A\r\nDate: D\r\n\r\nText"));

        let encoded = URL_SAFE.encode(&raw);
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(URL_SAFE.decode(encoded).unwrap(), raw.as_bytes());
    }
}
