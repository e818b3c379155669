//! In-memory stores
//!
//! Same contracts as the PostgreSQL stores, including uniqueness of username
//! and email and the user → portfolio cascade.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::error::{DatabaseError, DatabaseResult};

use super::{CredentialStore, SettingsStore};
use crate::models::{NewUser, Portfolio, SiteSettings, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    portfolios: HashMap<Uuid, Portfolio>,
}

impl Tables {
    fn check_unique(&self, new_user: &NewUser) -> DatabaseResult<()> {
        for user in self.users.values() {
            if user.username == new_user.username {
                return Err(DatabaseError::Duplicate("users_username_key".to_string()));
            }
            if user.email == new_user.email {
                return Err(DatabaseError::Duplicate("users_email_key".to_string()));
            }
        }
        Ok(())
    }

    fn insert_user(&mut self, new_user: &NewUser) -> DatabaseResult<User> {
        self.check_unique(new_user)?;
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            phone: new_user.phone.clone(),
            password_hash: new_user.password_hash.clone(),
            is_admin: new_user.is_admin,
            created_at: new_user.created_at,
            last_login: None,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn remove_user(&mut self, id: Uuid) {
        self.users.remove(&id);
        self.portfolios.remove(&id);
    }
}

/// Credential store held in process memory
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users, admins included
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn portfolio_count(&self) -> usize {
        self.tables.read().await.portfolios.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        self.tables.write().await.insert_user(new_user)
    }

    async fn create_user_with_portfolio(
        &self,
        new_user: &NewUser,
        mut portfolio: Portfolio,
    ) -> DatabaseResult<(User, Portfolio)> {
        let mut tables = self.tables.write().await;
        let user = tables.insert_user(new_user)?;
        portfolio.user_id = user.id;
        tables.portfolios.insert(user.id, portfolio.clone());
        Ok((user, portfolio))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", user_id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&user_id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn list_members(&self) -> DatabaseResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut members: Vec<User> = tables
            .users
            .values()
            .filter(|u| !u.is_admin)
            .cloned()
            .collect();
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(members)
    }

    async fn delete_user(&self, username: &str) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        let id = tables
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id);

        match id {
            Some(id) => {
                tables.remove_user(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_members(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<Uuid> = ids
            .iter()
            .copied()
            .filter(|id| tables.users.get(id).is_some_and(|u| !u.is_admin))
            .collect();

        for id in &doomed {
            tables.remove_user(*id);
        }
        Ok(doomed.len() as u64)
    }

    async fn find_portfolio(&self, user_id: Uuid) -> DatabaseResult<Option<Portfolio>> {
        Ok(self.tables.read().await.portfolios.get(&user_id).cloned())
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> DatabaseResult<Portfolio> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&portfolio.user_id) {
            return Err(DatabaseError::NotFound(format!(
                "user {}",
                portfolio.user_id
            )));
        }

        let stored = match tables.portfolios.get(&portfolio.user_id) {
            Some(existing) => Portfolio {
                id: existing.id,
                created_at: existing.created_at,
                ..portfolio.clone()
            },
            None => portfolio.clone(),
        };
        tables.portfolios.insert(stored.user_id, stored.clone());
        Ok(stored)
    }

    async fn list_member_portfolios(&self) -> DatabaseResult<Vec<(User, Portfolio)>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(User, Portfolio)> = tables
            .portfolios
            .values()
            .filter_map(|p| {
                tables
                    .users
                    .get(&p.user_id)
                    .filter(|u| !u.is_admin)
                    .map(|u| (u.clone(), p.clone()))
            })
            .collect();
        rows.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(rows)
    }
}

/// Settings singleton held in process memory
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    settings: Arc<RwLock<Option<SiteSettings>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self) -> DatabaseResult<Option<SiteSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &SiteSettings) -> DatabaseResult<SiteSettings> {
        let mut slot = self.settings.write().await;
        let stored = match slot.as_ref() {
            Some(existing) => SiteSettings {
                created_at: existing.created_at,
                ..settings.clone()
            },
            None => settings.clone(),
        };
        *slot = Some(stored.clone());
        Ok(stored)
    }
}
