//! Portfolio SQL shared by the PostgreSQL credential store

use sqlx::{PgExecutor, postgres::PgRow, FromRow};

use common::error::{DatabaseError, DatabaseResult};

use crate::models::{Portfolio, User};

const UPSERT_PORTFOLIO: &str = r#"
    INSERT INTO portfolios (
        id, user_id, template_id,
        full_name, company_name, job_title, bio, profile_pic, resume_file,
        email, phone, linkedin_url, github_url, twitter_url,
        skills,
        project1_title, project1_desc, project1_link,
        project2_title, project2_desc, project2_link,
        project3_title, project3_desc, project3_link,
        created_at, updated_at
    )
    VALUES (
        $1, $2, $3,
        $4, $5, $6, $7, $8, $9,
        $10, $11, $12, $13, $14,
        $15,
        $16, $17, $18,
        $19, $20, $21,
        $22, $23, $24,
        $25, $26
    )
    ON CONFLICT (user_id) DO UPDATE SET
        template_id = EXCLUDED.template_id,
        full_name = EXCLUDED.full_name,
        company_name = EXCLUDED.company_name,
        job_title = EXCLUDED.job_title,
        bio = EXCLUDED.bio,
        profile_pic = EXCLUDED.profile_pic,
        resume_file = EXCLUDED.resume_file,
        email = EXCLUDED.email,
        phone = EXCLUDED.phone,
        linkedin_url = EXCLUDED.linkedin_url,
        github_url = EXCLUDED.github_url,
        twitter_url = EXCLUDED.twitter_url,
        skills = EXCLUDED.skills,
        project1_title = EXCLUDED.project1_title,
        project1_desc = EXCLUDED.project1_desc,
        project1_link = EXCLUDED.project1_link,
        project2_title = EXCLUDED.project2_title,
        project2_desc = EXCLUDED.project2_desc,
        project2_link = EXCLUDED.project2_link,
        project3_title = EXCLUDED.project3_title,
        project3_desc = EXCLUDED.project3_desc,
        project3_link = EXCLUDED.project3_link,
        updated_at = EXCLUDED.updated_at
    RETURNING *
"#;

/// Insert or replace a portfolio, keyed by its owner
pub(crate) async fn upsert<'e, E>(executor: E, p: &Portfolio) -> DatabaseResult<Portfolio>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Portfolio>(UPSERT_PORTFOLIO)
        .bind(p.id)
        .bind(p.user_id)
        .bind(p.template_id)
        .bind(&p.full_name)
        .bind(&p.company_name)
        .bind(&p.job_title)
        .bind(&p.bio)
        .bind(&p.profile_pic)
        .bind(&p.resume_file)
        .bind(&p.email)
        .bind(&p.phone)
        .bind(&p.linkedin_url)
        .bind(&p.github_url)
        .bind(&p.twitter_url)
        .bind(&p.skills)
        .bind(&p.project1_title)
        .bind(&p.project1_desc)
        .bind(&p.project1_link)
        .bind(&p.project2_title)
        .bind(&p.project2_desc)
        .bind(&p.project2_link)
        .bind(&p.project3_title)
        .bind(&p.project3_desc)
        .bind(&p.project3_link)
        .bind(p.created_at)
        .bind(p.updated_at)
        .fetch_one(executor)
        .await
        .map_err(DatabaseError::from_query)
}

pub(crate) async fn find_by_user<'e, E>(executor: E, user_id: uuid::Uuid) -> DatabaseResult<Option<Portfolio>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Portfolio>("SELECT * FROM portfolios WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(DatabaseError::Query)
}

/// Split a `users JOIN portfolios` row; user columns are prefixed `u_`
pub(crate) fn split_joined_row(row: &PgRow) -> Result<(User, Portfolio), sqlx::Error> {
    use sqlx::Row;

    let user = User {
        id: row.try_get("u_id")?,
        username: row.try_get("u_username")?,
        email: row.try_get("u_email")?,
        phone: row.try_get("u_phone")?,
        password_hash: row.try_get("u_password_hash")?,
        is_admin: row.try_get("u_is_admin")?,
        created_at: row.try_get("u_created_at")?,
        last_login: row.try_get("u_last_login")?,
    };
    let portfolio = Portfolio::from_row(row)?;
    Ok((user, portfolio))
}

pub(crate) const MEMBER_PORTFOLIOS: &str = r#"
    SELECT p.*,
           u.id AS u_id, u.username AS u_username, u.email AS u_email,
           u.phone AS u_phone, u.password_hash AS u_password_hash,
           u.is_admin AS u_is_admin, u.created_at AS u_created_at,
           u.last_login AS u_last_login
    FROM portfolios p
    JOIN users u ON u.id = p.user_id
    WHERE u.is_admin = FALSE
    ORDER BY u.created_at DESC
"#;
