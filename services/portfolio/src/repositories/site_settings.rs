//! PostgreSQL site settings store

use async_trait::async_trait;
use sqlx::PgPool;

use common::error::{DatabaseError, DatabaseResult};

use super::SettingsStore;
use crate::models::SiteSettings;

#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self) -> DatabaseResult<Option<SiteSettings>> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            SELECT company_name, copyright_year, copyright_text, footer_text,
                   created_at, updated_at
            FROM site_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn save(&self, settings: &SiteSettings) -> DatabaseResult<SiteSettings> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            INSERT INTO site_settings
                (id, company_name, copyright_year, copyright_text, footer_text, created_at, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                copyright_year = EXCLUDED.copyright_year,
                copyright_text = EXCLUDED.copyright_text,
                footer_text = EXCLUDED.footer_text,
                updated_at = EXCLUDED.updated_at
            RETURNING company_name, copyright_year, copyright_text, footer_text,
                      created_at, updated_at
            "#,
        )
        .bind(&settings.company_name)
        .bind(&settings.copyright_year)
        .bind(&settings.copyright_text)
        .bind(&settings.footer_text)
        .bind(settings.created_at)
        .bind(settings.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }
}
