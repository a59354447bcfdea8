use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::repo_types::User;
use crate::config::MailerConfig;

/// Outbound notification seam. Implementations deliver the confirmation
/// email carrying the plaintext token.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(&self, user: &User, token: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
#[error("confirmation email to {email} could not be delivered: {reason}")]
pub struct NotificationDeliveryError {
    pub email: String,
    pub reason: String,
}

pub fn confirmation_url(app_base_url: &str, email: &str, token: &str) -> anyhow::Result<String> {
    let url = reqwest::Url::parse_with_params(
        &format!("{app_base_url}/api/v1/auth/confirm"),
        &[("email", email), ("token", token)],
    )
    .context("build confirmation url")?;
    Ok(url.into())
}

/// Picks the webhook mailer when a webhook URL is configured, otherwise logs.
pub fn from_config(cfg: &MailerConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    Ok(match &cfg.webhook_url {
        Some(url) => Arc::new(WebhookMailer::new(url, &cfg.app_base_url)?) as Arc<dyn Mailer>,
        None => Arc::new(LogMailer {
            app_base_url: cfg.app_base_url.clone(),
        }) as Arc<dyn Mailer>,
    })
}

/// Writes the confirmation link to the log. Development only: the link
/// contains the plaintext token.
#[derive(Clone)]
pub struct LogMailer {
    pub app_base_url: String,
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(&self, user: &User, token: &str) -> anyhow::Result<()> {
        let url = confirmation_url(&self.app_base_url, &user.email, token)?;
        info!(to = %user.email, confirmation_url = %url, "confirmation email (log only)");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    to: &'a str,
    subject: &'a str,
    confirmation_url: &'a str,
}

/// POSTs the message as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct WebhookMailer {
    http: reqwest::Client,
    webhook_url: String,
    app_base_url: String,
}

impl WebhookMailer {
    pub fn new(webhook_url: &str, app_base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build mailer http client")?;
        Ok(Self {
            http,
            webhook_url: webhook_url.to_string(),
            app_base_url: app_base_url.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_confirmation(&self, user: &User, token: &str) -> anyhow::Result<()> {
        let url = confirmation_url(&self.app_base_url, &user.email, token)?;
        self.http
            .post(&self.webhook_url)
            .json(&WebhookMessage {
                to: &user.email,
                subject: "Confirm your account",
                confirmation_url: &url,
            })
            .send()
            .await
            .context("mail webhook request")?
            .error_for_status()
            .context("mail webhook status")?;
        debug!(to = %user.email, "confirmation email handed to webhook");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    pub email: String,
    pub token: String,
}

/// In-memory mailer for tests; optionally fails every delivery.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentConfirmation>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_confirmation(&self, user: &User, token: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("smtp unavailable");
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentConfirmation {
                email: user.email.clone(),
                token: token.to_string(),
            });
        }
        Ok(())
    }
}
