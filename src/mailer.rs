// src/mailer.rs

use std::sync::Mutex;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("no recipient address")]
    NoRecipient,
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipient);
        }
        info!(
            "Email from {} to {}: {}\n{}",
            email.from, email.to, email.subject, email.body
        );
        Ok(())
    }
}

/// Keeps sent mail in memory so tests can inspect it.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipient);
        }
        self.outbox
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(email);
        Ok(())
    }
}
