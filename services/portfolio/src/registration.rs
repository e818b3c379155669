//! Deferred registration
//!
//! A submitted registration lives only in the session until the address is
//! proven by following the emailed link; only then does it become a User and
//! a default Portfolio. The states are
//!
//! ```text
//! NoPending --submit--> PendingUnverified --verify_email--> PendingVerified --finalize--> Finalized
//! ```
//!
//! Expiry is lazy: a pending registration is only found to be expired when an
//! operation reads it, and is discarded at that point.

use chrono::{DateTime, Duration, Utc};
use common::error::DatabaseError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        NewUser, PendingRegistration, Portfolio, RegistrationForm, SessionData, User,
        VerificationClaims,
    },
    notification::{Links, Mail, NotificationGateway},
    password,
    repositories::CredentialStore,
    token::{TokenCodec, TokenPurpose},
    validation,
};

/// How long a submitted registration waits for verification
pub fn registration_window() -> Duration {
    Duration::minutes(15)
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Whether the verification email went out; on `false` the link is only
    /// available in the operator log
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent { email_sent: bool },
    AlreadyVerified,
}

/// What the verification page shows about the pending registration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerificationStatus {
    pub email: String,
    pub email_verified: bool,
    pub expires_at: DateTime<Utc>,
}

/// Drives a registration from submission to a durable account
#[derive(Clone)]
pub struct RegistrationWorkflow {
    users: Arc<dyn CredentialStore>,
    tokens: TokenCodec,
    notifier: Arc<dyn NotificationGateway>,
    links: Links,
    clock: Arc<dyn Clock>,
}

impl RegistrationWorkflow {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        tokens: TokenCodec,
        notifier: Arc<dyn NotificationGateway>,
        links: Links,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            tokens,
            notifier,
            links,
            clock,
        }
    }

    /// Start a registration, replacing any registration already pending in
    /// this session
    pub async fn submit(
        &self,
        session: &mut SessionData,
        form: RegistrationForm,
    ) -> AppResult<SubmitOutcome> {
        let form = form.trimmed();
        validation::require("Username", &form.username)?;
        validation::require("Password", &form.password)?;
        validation::require("Email", &form.email)?;
        validation::validate_username(&form.username)?;
        validation::validate_email(&form.email)?;

        if self.users.find_user_by_username(&form.username).await?.is_some() {
            return Err(AppError::DuplicateIdentity(
                "Username already exists.".to_string(),
            ));
        }

        let now = self.clock.now();
        let password_hash = password::hash_password(&form.password)?;

        let mut pending = PendingRegistration {
            username: form.username,
            password_hash,
            original_password: form.password,
            email: form.email,
            phone: form.phone,
            college_name: form.college_name,
            college_year: form.college_year,
            course_stream: form.course_stream,
            email_verified: false,
            email_token: String::new(),
            created_at: now,
            expires_at: now + registration_window(),
        };

        let token = self.tokens.issue(&pending.claims(), TokenPurpose::EmailConfirm)?;
        pending.email_token = token.clone();

        let email_sent = self.send_verification(&pending.email, &pending.username, &token).await;

        if session.pending_registration.is_some() {
            info!("Replacing pending registration in session");
        }
        info!("Registration submitted for {}", pending.username);
        session.pending_registration = Some(pending);
        session.email_token = Some(token);

        Ok(SubmitOutcome { email_sent })
    }

    /// Accept a verification link and create the account
    pub async fn verify_email(&self, session: &mut SessionData, token: &str) -> AppResult<User> {
        let claims: VerificationClaims = self.tokens.verify(
            token,
            TokenPurpose::EmailConfirm,
            TokenPurpose::EmailConfirm.max_age(),
        )?;

        let pending = session
            .pending_registration
            .as_mut()
            .ok_or(AppError::NoActiveSession)?;

        if !pending.matches(&claims) {
            warn!(
                "Verification token for {} replayed into the session of {}",
                claims.username, pending.username
            );
            return Err(AppError::Mismatch);
        }

        if pending.is_expired(self.clock.now()) {
            info!("Pending registration for {} expired", pending.username);
            session.pending_registration = None;
            return Err(AppError::RegistrationExpired);
        }

        pending.email_verified = true;
        info!("Email verified for {}", pending.username);

        self.finalize(session).await
    }

    /// Promote a verified pending registration into a User and its Portfolio
    pub async fn finalize(&self, session: &mut SessionData) -> AppResult<User> {
        let pending = session
            .pending_registration
            .clone()
            .ok_or(AppError::NoActiveSession)?;

        if !pending.email_verified {
            return Err(AppError::Validation(
                "Email address has not been verified.".to_string(),
            ));
        }

        if self
            .users
            .find_user_by_username(&pending.username)
            .await?
            .is_some()
        {
            session.pending_registration = None;
            return Err(AppError::DuplicateIdentity(
                "Username no longer available. Please register again.".to_string(),
            ));
        }

        let now = self.clock.now();
        let new_user = NewUser {
            username: pending.username.clone(),
            email: pending.email.clone(),
            phone: Some(pending.phone.clone()).filter(|p| !p.is_empty()),
            password_hash: pending.password_hash.clone(),
            is_admin: false,
            created_at: now,
        };

        let mut portfolio = Portfolio::with_defaults(Uuid::nil(), now);
        if let Some(bio) = pending.education_bio() {
            portfolio.bio = bio;
        }

        let user = match self.users.create_user_with_portfolio(&new_user, portfolio).await {
            Ok((user, _)) => user,
            Err(DatabaseError::Duplicate(constraint)) => {
                warn!("Finalize lost a uniqueness race on {}", constraint);
                session.pending_registration = None;
                return Err(AppError::DuplicateIdentity(
                    "Username or email no longer available. Please register again.".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let mail = Mail::credentials(&user.username, &pending.original_password, &self.links.login());
        if !self.notifier.send(&user.email, &mail.subject, &mail.body).await {
            warn!("Credentials email for {} was not delivered", user.username);
        }

        session.pending_registration = None;
        session.email_token = None;
        info!("Registration finalized for {}", user.username);

        Ok(user)
    }

    /// Send a fresh verification link without extending the window
    pub async fn resend_verification(&self, session: &mut SessionData) -> AppResult<ResendOutcome> {
        let pending = self.live_pending(session)?;

        if pending.email_verified {
            return Ok(ResendOutcome::AlreadyVerified);
        }

        let token = self.tokens.issue(&pending.claims(), TokenPurpose::EmailConfirm)?;
        let email_sent = self.send_verification(&pending.email, &pending.username, &token).await;

        if let Some(pending) = session.pending_registration.as_mut() {
            pending.email_token = token.clone();
        }
        session.email_token = Some(token);

        Ok(ResendOutcome::Sent { email_sent })
    }

    /// Current state of the pending registration
    pub fn status(&self, session: &mut SessionData) -> AppResult<VerificationStatus> {
        let pending = self.live_pending(session)?;
        Ok(VerificationStatus {
            email: pending.email,
            email_verified: pending.email_verified,
            expires_at: pending.expires_at,
        })
    }

    /// The pending registration, discarding it if its window has lapsed
    fn live_pending(&self, session: &mut SessionData) -> AppResult<PendingRegistration> {
        let pending = session
            .pending_registration
            .clone()
            .ok_or(AppError::NoActiveSession)?;

        if pending.is_expired(self.clock.now()) {
            info!("Pending registration for {} expired", pending.username);
            session.pending_registration = None;
            return Err(AppError::RegistrationExpired);
        }

        Ok(pending)
    }

    async fn send_verification(&self, email: &str, username: &str, token: &str) -> bool {
        let url = self.links.verify_email(token);
        let mail = Mail::verification(username, &url);
        let sent = self.notifier.send(email, &mail.subject, &mail.body).await;
        if !sent {
            warn!("Verification email for {} not delivered; link: {}", username, url);
        }
        sent
    }
}
