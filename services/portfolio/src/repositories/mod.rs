//! Persistence seams
//!
//! The service talks to storage only through [`CredentialStore`] and
//! [`SettingsStore`]. PostgreSQL implementations back production; the
//! in-memory ones back tests and database-less local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewUser, Portfolio, SiteSettings, User};

pub mod memory;
pub mod portfolio;
pub mod site_settings;
pub mod user;

pub use memory::{MemoryCredentialStore, MemorySettingsStore};
pub use site_settings::PgSettingsStore;
pub use user::PgCredentialStore;

/// Users and their portfolios
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Insert a user without a portfolio; unique violations surface as
    /// `DatabaseError::Duplicate`
    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Insert a user and its portfolio atomically; the portfolio's `user_id`
    /// is overwritten with the new user's id
    async fn create_user_with_portfolio(
        &self,
        new_user: &NewUser,
        portfolio: Portfolio,
    ) -> DatabaseResult<(User, Portfolio)>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> DatabaseResult<()>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()>;

    /// Non-admin users, newest first
    async fn list_members(&self) -> DatabaseResult<Vec<User>>;

    /// Delete a user and, by cascade, its portfolio
    async fn delete_user(&self, username: &str) -> DatabaseResult<bool>;

    /// Delete the listed non-admin users, returning how many went
    async fn delete_members(&self, ids: &[Uuid]) -> DatabaseResult<u64>;

    async fn find_portfolio(&self, user_id: Uuid) -> DatabaseResult<Option<Portfolio>>;

    /// Insert or fully replace the portfolio of `portfolio.user_id` in one
    /// statement
    async fn save_portfolio(&self, portfolio: &Portfolio) -> DatabaseResult<Portfolio>;

    /// Non-admin users that have a portfolio, with that portfolio
    async fn list_member_portfolios(&self) -> DatabaseResult<Vec<(User, Portfolio)>>;
}

/// The site settings singleton
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self) -> DatabaseResult<Option<SiteSettings>>;

    async fn save(&self, settings: &SiteSettings) -> DatabaseResult<SiteSettings>;
}
