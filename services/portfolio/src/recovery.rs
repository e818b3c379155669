//! Forgotten username and password recovery
//!
//! Both request operations answer identically whether or not the email
//! belongs to an account, so they cannot be used to enumerate members.
//! Reset tokens are not tracked server side and stay usable until they age
//! out.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    models::User,
    notification::{Links, Mail, NotificationGateway},
    password,
    repositories::CredentialStore,
    token::{TokenCodec, TokenPurpose},
    validation,
};

pub const USERNAME_NOTICE: &str =
    "If an account with that email exists, the username has been sent.";
pub const PASSWORD_NOTICE: &str =
    "If an account with that email exists, a reset link has been sent.";

#[derive(Clone)]
pub struct RecoveryService {
    users: Arc<dyn CredentialStore>,
    tokens: TokenCodec,
    notifier: Arc<dyn NotificationGateway>,
    links: Links,
}

impl RecoveryService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        tokens: TokenCodec,
        notifier: Arc<dyn NotificationGateway>,
        links: Links,
    ) -> Self {
        Self {
            users,
            tokens,
            notifier,
            links,
        }
    }

    /// Mail the username registered for `email`, if any
    pub async fn forgot_username(&self, email: &str) -> AppResult<&'static str> {
        let email = email.trim();
        validation::require("Email address", email)?;

        match self.users.find_user_by_email(email).await? {
            Some(user) => {
                let mail = Mail::username_reminder(&user.username, &self.links.login());
                if !self.notifier.send(&user.email, &mail.subject, &mail.body).await {
                    warn!("Username reminder for {} was not delivered", user.username);
                }
                info!("Username reminder requested for {}", user.username);
            }
            None => info!("Username reminder requested for unknown email"),
        }

        Ok(USERNAME_NOTICE)
    }

    /// Mail a one hour password reset link for `email`, if any
    pub async fn forgot_password(&self, email: &str) -> AppResult<&'static str> {
        let email = email.trim();
        validation::require("Email address", email)?;

        match self.users.find_user_by_email(email).await? {
            Some(user) => {
                let token = self.tokens.issue(&user.email, TokenPurpose::PasswordReset)?;
                let url = self.links.reset_password(&token);
                let mail = Mail::password_reset(&user.username, &url);
                if !self.notifier.send(&user.email, &mail.subject, &mail.body).await {
                    warn!("Reset email for {} not delivered; link: {}", user.username, url);
                }
                info!("Password reset requested for {}", user.username);
            }
            None => info!("Password reset requested for unknown email"),
        }

        Ok(PASSWORD_NOTICE)
    }

    /// Resolve a reset token to the account it was issued for
    pub async fn check_reset_token(&self, token: &str) -> AppResult<User> {
        let email: String = self.tokens.verify(
            token,
            TokenPurpose::PasswordReset,
            TokenPurpose::PasswordReset.max_age(),
        )?;

        self.users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid reset link.".to_string()))
    }

    /// Replace the password of the account a reset token was issued for
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AppResult<()> {
        let user = self.check_reset_token(token).await?;

        let new_password = new_password.trim();
        validation::validate_new_password(new_password, confirm_password.trim())?;

        let hash = password::hash_password(new_password)?;
        self.users.update_password(user.id, &hash).await?;
        info!("Password reset for {}", user.username);

        Ok(())
    }
}
