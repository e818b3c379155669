//! Outbound email
//!
//! [`NotificationGateway::send`] never fails the caller: it reports whether
//! the message was delivered (or deliberately logged because no SMTP server is
//! configured) and leaves the decision to the workflow, which treats the
//! result as advisory.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::config::{AppConfig, RunMode, SmtpSettings};

/// Sends a message to one address
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// `true` when delivered or intentionally logged, `false` when delivery
    /// was attempted and failed
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// Pick the SMTP gateway when SMTP is fully configured, the log gateway otherwise
pub fn gateway_from_config(config: &AppConfig) -> Arc<dyn NotificationGateway> {
    if config.smtp.is_configured() {
        Arc::new(SmtpGateway::new(config.smtp.clone(), config.mode))
    } else {
        warn!("SMTP not configured; outgoing mail will be written to the log");
        Arc::new(LogGateway)
    }
}

/// Delivers through an SMTP relay with `lettre`
pub struct SmtpGateway {
    settings: SmtpSettings,
    mode: RunMode,
}

#[derive(Debug, thiserror::Error)]
enum SmtpError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP server not configured")]
    NotConfigured,
}

impl SmtpGateway {
    pub fn new(settings: SmtpSettings, mode: RunMode) -> Self {
        Self { settings, mode }
    }

    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), SmtpError> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        let host = self
            .settings
            .server
            .as_deref()
            .ok_or(SmtpError::NotConfigured)?;

        let email = Message::builder()
            .from(self.settings.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        // 465 is implicit TLS, 587 upgrades with STARTTLS, anything else is plain.
        let mut builder = match self.settings.port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        }
        .port(self.settings.port)
        .timeout(Some(std::time::Duration::from_secs(10)));

        if let (Some(user), Some(pass)) = (&self.settings.username, &self.settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        builder.build().send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for SmtpGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        match self.deliver(to, subject, body).await {
            Ok(()) => {
                info!(to = to, subject = subject, "Email sent");
                true
            }
            Err(e) => {
                error!(to = to, subject = subject, "Failed to send email: {}", e);
                if !self.mode.is_production() {
                    warn!("[FALLBACK] Undelivered message for {}:\n{}", to, body);
                }
                false
            }
        }
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        info!("[DEV] SMTP not configured; message for {} ({}):\n{}", to, subject, body);
        true
    }
}

/// A message captured by [`MemoryOutbox`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records messages in memory; can be switched to report failed delivery
#[derive(Clone, Default)]
pub struct MemoryOutbox {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_to(&self, to: &str) -> Option<SentMessage> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl NotificationGateway for MemoryOutbox {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMessage {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        !*self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Absolute links embedded in outgoing mail
#[derive(Debug, Clone)]
pub struct Links {
    domain_url: String,
}

impl Links {
    pub fn new(domain_url: &str) -> Self {
        Self {
            domain_url: domain_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verify_email(&self, token: &str) -> String {
        format!("{}/verify_email/{}", self.domain_url, token)
    }

    pub fn reset_password(&self, token: &str) -> String {
        format!("{}/reset-password/{}", self.domain_url, token)
    }

    pub fn login(&self) -> String {
        format!("{}/", self.domain_url)
    }
}

/// Subject and body of an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn verification(username: &str, verify_url: &str) -> Self {
        Self {
            subject: "Verify your email address".to_string(),
            body: format!(
                "Hi {},\n\nPlease verify your email by clicking the link below:\n\n{}\n\n\
                 If you did not request this, ignore.\n\nThanks.",
                username, verify_url
            ),
        }
    }

    pub fn credentials(username: &str, password: &str, login_url: &str) -> Self {
        Self {
            subject: "Your portfolio builder account".to_string(),
            body: format!(
                "Hi {},\n\nYour account has been created.\n\nUsername: {}\nPassword: {}\n\n\
                 Log in at {}\n\nKeep this message somewhere safe.",
                username, username, password, login_url
            ),
        }
    }

    pub fn username_reminder(username: &str, login_url: &str) -> Self {
        Self {
            subject: "Your username".to_string(),
            body: format!(
                "Hello,\n\nThe username registered for this email address is: {}\n\n\
                 Log in at {}",
                username, login_url
            ),
        }
    }

    pub fn password_reset(username: &str, reset_url: &str) -> Self {
        Self {
            subject: "Reset your password".to_string(),
            body: format!(
                "Hi {},\n\nUse the link below to choose a new password. It is valid for one hour.\n\n{}\n\n\
                 If you did not ask for a reset, ignore this message.",
                username, reset_url
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_gateway_reports_success() {
        assert!(LogGateway.send("a@x.com", "subject", "body").await);
    }

    #[tokio::test]
    async fn outbox_records_and_can_fail() {
        let outbox = MemoryOutbox::new();
        assert!(outbox.send("a@x.com", "one", "body").await);

        outbox.set_failing(true);
        assert!(!outbox.send("a@x.com", "two", "body").await);

        assert_eq!(outbox.messages().len(), 2);
        assert_eq!(outbox.last_to("a@x.com").unwrap().subject, "two");
    }

    #[tokio::test]
    async fn smtp_failure_is_reported_not_raised() {
        let gateway = SmtpGateway::new(
            SmtpSettings {
                server: Some("smtp.example.com".to_string()),
                port: 587,
                username: None,
                password: None,
                from: "not an address".to_string(),
            },
            RunMode::Development,
        );
        assert!(!gateway.send("a@x.com", "subject", "body").await);
    }

    #[test]
    fn links_are_absolute() {
        let links = Links::new("https://folio.example.com/");
        assert_eq!(
            links.verify_email("abc"),
            "https://folio.example.com/verify_email/abc"
        );
        assert_eq!(
            links.reset_password("abc"),
            "https://folio.example.com/reset-password/abc"
        );
    }
}
