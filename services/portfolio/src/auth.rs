//! Password login and logout
//!
//! A successful login places the user's id in the session; every later
//! request resolves that claim through the session guard.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{LoginCredentials, SessionData, User},
    password,
    repositories::CredentialStore,
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(users: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    async fn check_credentials(&self, credentials: &LoginCredentials) -> AppResult<User> {
        let user = self
            .users
            .find_user_by_username(credentials.username.trim())
            .await?;

        match user {
            Some(user) if password::verify_password(&credentials.password, &user.password_hash) => {
                Ok(user)
            }
            _ => {
                warn!("Failed login for {}", credentials.username);
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Verify credentials and bind the user to the session
    pub async fn login(
        &self,
        session: &mut SessionData,
        credentials: &LoginCredentials,
    ) -> AppResult<User> {
        let user = self.check_credentials(credentials).await?;
        self.bind(session, &user).await?;
        Ok(user)
    }

    /// Like [`AuthService::login`], but only administrators get in
    pub async fn admin_login(
        &self,
        session: &mut SessionData,
        credentials: &LoginCredentials,
    ) -> AppResult<User> {
        let user = self.check_credentials(credentials).await?;
        if !user.is_admin {
            warn!("Non-admin {} tried the admin login", user.username);
            return Err(AppError::InvalidCredentials);
        }
        self.bind(session, &user).await?;
        Ok(user)
    }

    async fn bind(&self, session: &mut SessionData, user: &User) -> AppResult<()> {
        let now = self.clock.now();
        session.user_id = Some(user.id);
        session.logged_in_at = Some(now);
        session.last_active = Some(now);
        self.users.record_login(user.id, now).await?;
        info!("User {} logged in", user.username);
        Ok(())
    }

    pub fn logout(&self, session: &mut SessionData) {
        if let Some(user_id) = session.user_id {
            info!("User {} logged out", user_id);
        }
        session.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, models::NewUser, repositories::MemoryCredentialStore};
    use chrono::Utc;

    async fn service(is_admin: bool) -> (AuthService, MemoryCredentialStore) {
        let users = MemoryCredentialStore::new();
        users
            .create_user(&NewUser {
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                phone: None,
                password_hash: password::hash_password("pw123456").unwrap(),
                is_admin,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let service = AuthService::new(
            Arc::new(users.clone()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        (service, users)
    }

    fn creds(password: &str) -> LoginCredentials {
        LoginCredentials {
            username: "alice".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_binds_user_and_stamps_last_login() {
        let (service, users) = service(false).await;
        let mut session = SessionData::default();

        let user = service.login(&mut session, &creds("pw123456")).await.unwrap();
        assert_eq!(session.user_id, Some(user.id));
        assert!(users.find_user_by_id(user.id).await.unwrap().unwrap().last_login.is_some());

        service.logout(&mut session);
        assert_eq!(session.user_id, None);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (service, _) = service(false).await;
        let mut session = SessionData::default();

        let result = service.login(&mut session, &creds("nope")).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn admin_login_requires_admin_flag() {
        let (member_service, _) = service(false).await;
        let mut session = SessionData::default();
        let result = member_service.admin_login(&mut session, &creds("pw123456")).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));

        let (admin_service, _) = service(true).await;
        assert!(admin_service.admin_login(&mut session, &creds("pw123456")).await.is_ok());
    }
}
