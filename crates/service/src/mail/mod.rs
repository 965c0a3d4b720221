//! Transactional email sending abstraction.
//!
//! `EmailSender` is object-safe so callers hold `Arc<dyn EmailSender>`:
//! `HttpEmailSender` talks to a JSON mail API, `LogEmailSender` only traces,
//! `FakeEmailSender` records messages for tests.

pub mod templates;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use configs::{MailConfig, MailProvider};

/// A rendered email message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("mail api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("rejected recipient: {0}")]
    Rejected(String),
}

/// Abstraction over an email transport.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> Result<(), MailError>;
}

pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<(), MailError> {
        info!(
            to = %msg.to,
            subject = %msg.subject,
            event = "email_logged",
            "would send email\n---TEXT---\n{}",
            msg.text,
        );
        Ok(())
    }
}

/// Captures sent messages in memory. Recipients listed in `fail_for` error out.
#[derive(Default)]
pub struct FakeEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail_for: Vec<String>,
}

impl FakeEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self { sent: Mutex::default(), fail_for: recipients.iter().map(|r| r.to_string()).collect() }
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent_messages().pop()
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<(), MailError> {
        if self.fail_for.iter().any(|r| r == &msg.to) {
            return Err(MailError::Rejected(msg.to));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(msg);
        }
        Ok(())
    }
}

/// POSTs `{from, to, subject, html, text}` to a mail API with a bearer key.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl HttpEmailSender {
    /// Every request, connect included, is bounded by `timeout`.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self { client, api_url: api_url.into(), api_key: api_key.into(), from: from.into() })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<(), MailError> {
        let body = OutgoingMail { from: &self.from, to: &msg.to, subject: &msg.subject, html: &msg.html, text: &msg.text };
        let mut req = self.client.post(&self.api_url).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let response = req.send().await.map_err(|e| MailError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, body });
        }
        info!(to = %msg.to, subject = %msg.subject, event = "email_sent", "email sent via mail api");
        Ok(())
    }
}

/// Build the configured transport.
pub fn sender_from_config(cfg: &MailConfig) -> Arc<dyn EmailSender> {
    match cfg.provider {
        MailProvider::Http => {
            let timeout = Duration::from_secs(cfg.timeout_secs);
            match HttpEmailSender::new(cfg.api_url.clone(), cfg.api_key.clone(), cfg.from.clone(), timeout) {
                Ok(sender) => Arc::new(sender),
                Err(e) => {
                    error!(error = %e, event = "mail_client_failed", "could not build mail api client; logging mail instead");
                    Arc::new(LogEmailSender)
                }
            }
        }
        MailProvider::Log => Arc::new(LogEmailSender),
    }
}
