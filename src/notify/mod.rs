//! Email notification dispatch.
//!
//! [`Notifier`] turns a subject and body into exactly one outbound message
//! for the configured recipient. Delivery itself is delegated to a
//! [`Mailer`]; [`GmailMailer`] is the production implementation, backed by a
//! [`TokenStore`] holding its OAuth credentials.

mod gmail;
mod token;

pub use gmail::{GMAIL_SEND_SCOPE, GmailMailer, authorization_url, exchange_code};
pub use token::{ClientSecrets, FileTokenStore, MemoryTokenStore, StoredToken, TokenStore};

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{error, info};

/// A plain-text email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    /// Renders the message as RFC 5322 text with CRLF line endings.
    ///
    /// Non-ASCII subjects are emitted as an RFC 2047 encoded word. Line breaks
    /// inside header values are flattened to spaces.
    pub fn to_rfc5322(&self) -> String {
        let to = single_line(&self.to);
        let subject = single_line(&self.subject);
        let subject = if subject.is_ascii() {
            subject
        } else {
            format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
        };
        let body = self.body.lines().collect::<Vec<_>>().join("\r\n");

        format!(
            "To: {to}\r\n\
             Subject: {subject}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=\"utf-8\"\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {body}\r\n"
        )
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Provider acknowledgement of a delivered message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentMessage {
    pub id: Option<String>,
}

/// Delivers a single message through some mail provider.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<SentMessage>;
}

/// Sends status emails to a single configured recipient.
pub struct Notifier<M> {
    mailer: M,
    recipient: Option<String>,
}

impl<M: Mailer> Notifier<M> {
    /// A blank recipient counts as unset.
    pub fn new(mailer: M, recipient: Option<String>) -> Self {
        let recipient = recipient
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Self { mailer, recipient }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// Sends one message and reports whether the provider accepted it.
    ///
    /// With no recipient configured this fails without contacting the
    /// provider. There is no retry.
    pub async fn notify(&self, subject: &str, body: &str) -> bool {
        let Some(recipient) = &self.recipient else {
            error!("RECIPIENT_EMAIL must be set (in the environment or a .env file)");
            return false;
        };

        let message = OutgoingMessage {
            to: recipient.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        match self.mailer.send(&message).await {
            Ok(sent) => {
                info!(
                    recipient = %recipient,
                    message_id = sent.id.as_deref().unwrap_or("-"),
                    "Email notification sent"
                );
                true
            }
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Failed to send email");
                false
            }
        }
    }
}
