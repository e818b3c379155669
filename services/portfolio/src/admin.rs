//! Member administration and site settings

use chrono::{DateTime, Duration, Utc};
use common::error::DatabaseError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::info;
use uuid::Uuid;

use crate::{
    clock::Clock,
    csv_export,
    error::{AppError, AppResult},
    models::{NewUser, PortfolioView, SiteSettings, SiteSettingsUpdate, User, UserSummary},
    password,
    repositories::{CredentialStore, SettingsStore},
    validation,
};

/// Username and email of the seeded administrator
pub const SEED_ADMIN_USERNAME: &str = "admin";
pub const SEED_ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone, Serialize)]
pub struct MemberOverview {
    pub members: Vec<UserSummary>,
    /// Members who joined in the last 7 days
    pub recent_users: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analytics {
    pub total_users: usize,
    pub users_with_portfolios: usize,
    pub users_without_portfolios: usize,
    /// Members who joined in the last 30 days
    pub recent_registrations: usize,
    pub template_usage: BTreeMap<i32, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: UserSummary,
    pub portfolio: Option<PortfolioView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAdminForm {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// A generated CSV attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn CredentialStore>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            settings,
            clock,
        }
    }

    fn joined_since(members: &[User], cutoff: DateTime<Utc>) -> usize {
        members.iter().filter(|u| u.created_at >= cutoff).count()
    }

    pub async fn list_members(&self) -> AppResult<MemberOverview> {
        let members = self.users.list_members().await?;
        let recent_users = Self::joined_since(&members, self.clock.now() - Duration::days(7));

        Ok(MemberOverview {
            members: members.iter().map(UserSummary::from).collect(),
            recent_users,
        })
    }

    pub async fn export_users(&self) -> AppResult<CsvExport> {
        let members = self.users.list_members().await?;
        Ok(CsvExport {
            filename: csv_export::export_filename("users", self.clock.now()),
            body: csv_export::users_csv(&members),
        })
    }

    pub async fn export_portfolios(&self) -> AppResult<CsvExport> {
        let rows = self.users.list_member_portfolios().await?;
        Ok(CsvExport {
            filename: csv_export::export_filename("portfolios", self.clock.now()),
            body: csv_export::portfolios_csv(&rows),
        })
    }

    /// Delete a user and its portfolio
    pub async fn delete_user(&self, username: &str) -> AppResult<()> {
        if !self.users.delete_user(username).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        info!("Deleted user {}", username);
        Ok(())
    }

    /// Delete the listed members; administrators in the list are skipped
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::Validation("No users selected".to_string()));
        }
        let deleted = self.users.delete_members(ids).await?;
        info!("Bulk deleted {} of {} requested users", deleted, ids.len());
        Ok(deleted)
    }

    pub async fn create_admin(&self, form: NewAdminForm) -> AppResult<User> {
        let username = form.username.trim();
        let email = form.email.trim();
        if username.is_empty() || form.password.is_empty() || email.is_empty() {
            return Err(AppError::Validation("All fields are required.".to_string()));
        }

        if self.users.find_user_by_username(username).await?.is_some() {
            return Err(AppError::DuplicateIdentity(
                "Username already exists.".to_string(),
            ));
        }
        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AppError::DuplicateIdentity("Email already exists.".to_string()));
        }

        let new_admin = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: password::hash_password(&form.password)?,
            is_admin: true,
            created_at: self.clock.now(),
        };

        let admin = self
            .users
            .create_user(&new_admin)
            .await
            .map_err(duplicate_identity)?;
        info!("Created admin user {}", admin.username);
        Ok(admin)
    }

    pub async fn analytics(&self) -> AppResult<Analytics> {
        let members = self.users.list_members().await?;
        let with_portfolios = self.users.list_member_portfolios().await?;

        let mut template_usage = BTreeMap::new();
        for (_, portfolio) in &with_portfolios {
            *template_usage.entry(portfolio.template_id).or_insert(0) += 1;
        }

        Ok(Analytics {
            total_users: members.len(),
            users_with_portfolios: with_portfolios.len(),
            users_without_portfolios: members.len().saturating_sub(with_portfolios.len()),
            recent_registrations: Self::joined_since(
                &members,
                self.clock.now() - Duration::days(30),
            ),
            template_usage,
        })
    }

    pub async fn user_details(&self, username: &str) -> AppResult<UserDetails> {
        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let portfolio = self.users.find_portfolio(user.id).await?;

        Ok(UserDetails {
            user: UserSummary::from(&user),
            portfolio: portfolio.map(PortfolioView::from),
        })
    }

    /// The stored settings, creating the row with defaults on first access
    pub async fn site_settings(&self) -> AppResult<SiteSettings> {
        match self.settings.get().await? {
            Some(settings) => Ok(settings),
            None => {
                info!("Creating default site settings");
                Ok(self
                    .settings
                    .save(&SiteSettings::defaults(self.clock.now()))
                    .await?)
            }
        }
    }

    pub async fn update_site_settings(&self, update: SiteSettingsUpdate) -> AppResult<SiteSettings> {
        let mut settings = self.site_settings().await?;
        settings.apply(update, self.clock.now());
        let saved = self.settings.save(&settings).await?;
        info!("Site settings updated");
        Ok(saved)
    }
}

/// Settings to render with: the stored row, or defaults when none exists
pub async fn effective_settings(
    settings: &dyn SettingsStore,
    now: DateTime<Utc>,
) -> AppResult<SiteSettings> {
    Ok(settings
        .get()
        .await?
        .unwrap_or_else(|| SiteSettings::defaults(now)))
}

/// Create the `admin` account unless it already exists
pub async fn seed_admin(
    users: &dyn CredentialStore,
    password: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<User>> {
    if users.find_user_by_username(SEED_ADMIN_USERNAME).await?.is_some() {
        return Ok(None);
    }

    validation::require("Admin password", password)?;
    let admin = users
        .create_user(&NewUser {
            username: SEED_ADMIN_USERNAME.to_string(),
            email: SEED_ADMIN_EMAIL.to_string(),
            phone: None,
            password_hash: password::hash_password(password)?,
            is_admin: true,
            created_at: now,
        })
        .await
        .map_err(duplicate_identity)?;

    info!("Seeded admin user {}", admin.username);
    Ok(Some(admin))
}

fn duplicate_identity(err: DatabaseError) -> AppError {
    match err {
        DatabaseError::Duplicate(constraint) => {
            AppError::DuplicateIdentity(format!("Already exists ({})", constraint))
        }
        other => other.into(),
    }
}
