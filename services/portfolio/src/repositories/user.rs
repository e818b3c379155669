//! PostgreSQL credential store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use common::error::{DatabaseError, DatabaseResult};

use super::{CredentialStore, portfolio};
use crate::models::{NewUser, Portfolio, User};

const USER_COLUMNS: &str =
    "id, username, email, phone, password_hash, is_admin, created_at, last_login";

/// Users and portfolios in PostgreSQL
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new credential store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(&self, column: &str, value: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (id, username, email, phone, password_hash, is_admin, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id, username, email, phone, password_hash, is_admin, created_at, last_login
"#;

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        sqlx::query_as::<_, User>(INSERT_USER)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.phone)
            .bind(&new_user.password_hash)
            .bind(new_user.is_admin)
            .bind(new_user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)
    }

    async fn create_user_with_portfolio(
        &self,
        new_user: &NewUser,
        mut new_portfolio: Portfolio,
    ) -> DatabaseResult<(User, Portfolio)> {
        info!("Creating new user with portfolio: {}", new_user.username);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let user = sqlx::query_as::<_, User>(INSERT_USER)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.phone)
            .bind(&new_user.password_hash)
            .bind(new_user.is_admin)
            .bind(new_user.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;

        new_portfolio.user_id = user.id;
        let saved = portfolio::upsert(&mut *tx, &new_portfolio).await?;

        tx.commit().await.map_err(DatabaseError::Query)?;
        Ok((user, saved))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(())
    }

    async fn list_members(&self) -> DatabaseResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE is_admin = FALSE ORDER BY created_at DESC",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn delete_user(&self, username: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_members(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1) AND is_admin = FALSE")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(result.rows_affected())
    }

    async fn find_portfolio(&self, user_id: Uuid) -> DatabaseResult<Option<Portfolio>> {
        portfolio::find_by_user(&self.pool, user_id).await
    }

    async fn save_portfolio(&self, p: &Portfolio) -> DatabaseResult<Portfolio> {
        portfolio::upsert(&self.pool, p).await
    }

    async fn list_member_portfolios(&self) -> DatabaseResult<Vec<(User, Portfolio)>> {
        let rows = sqlx::query(portfolio::MEMBER_PORTFOLIOS)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter()
            .map(|row| portfolio::split_joined_row(row).map_err(DatabaseError::Query))
            .collect()
    }
}
