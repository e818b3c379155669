//! Administration endpoints
//!
//! Everything under `/admin` except the login form and the public settings
//! read requires an administrator session.

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::Message;
use crate::{
    admin::{Analytics, CsvExport, MemberOverview, NewAdminForm, UserDetails, effective_settings},
    error::{AppError, AppResult},
    middleware::{AdminUser, Session},
    models::{LoginCredentials, SiteSettings, SiteSettingsUpdate},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(overview))
        .route("/admin/login", post(login))
        .route("/admin/export_users_csv", get(export_users))
        .route("/admin/export_portfolios_csv", get(export_portfolios))
        .route("/admin/delete-user/:username", delete(delete_user))
        .route("/admin/bulk-delete", post(bulk_delete))
        .route("/admin/create-admin", post(create_admin))
        .route("/admin/analytics", get(analytics))
        .route("/admin/user-details/:username", get(user_details))
        .route(
            "/admin/site-settings",
            get(site_settings).post(update_site_settings),
        )
        .route("/admin/api/site-settings", get(public_site_settings))
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(credentials): Form<LoginCredentials>,
) -> AppResult<impl IntoResponse> {
    let key = format!("admin-login:{}", credentials.username.trim().to_lowercase());
    if !state.rate_limiter.is_allowed(&key).await {
        return Err(AppError::RateLimited);
    }

    state.auth.admin_login(&mut session.data, &credentials).await?;
    session.save().await?;
    state.rate_limiter.reset(&key).await;

    Ok(Message::redirect("Admin login successful.", "/admin"))
}

pub async fn overview(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<MemberOverview>> {
    Ok(Json(state.admin.list_members().await?))
}

fn csv_attachment(export: CsvExport) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", export.filename),
            ),
        ],
        export.body,
    )
}

pub async fn export_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(csv_attachment(state.admin.export_users().await?))
}

pub async fn export_portfolios(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(csv_attachment(state.admin.export_portfolios().await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(username): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.admin.delete_user(&username).await?;
    Ok(Message::ok(format!(
        "User {} and their portfolio have been deleted.",
        username
    )))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.admin.bulk_delete(&request.user_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Deleted {} users.", deleted),
        "deleted_count": deleted,
    })))
}

pub async fn create_admin(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<NewAdminForm>,
) -> AppResult<impl IntoResponse> {
    let admin = state.admin.create_admin(form).await?;
    Ok(Message::ok(format!(
        "Admin user {} created successfully.",
        admin.username
    )))
}

pub async fn analytics(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Analytics>> {
    Ok(Json(state.admin.analytics().await?))
}

pub async fn user_details(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserDetails>> {
    Ok(Json(state.admin.user_details(&username).await?))
}

pub async fn site_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<SiteSettings>> {
    Ok(Json(state.admin.site_settings().await?))
}

pub async fn update_site_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(update): Form<SiteSettingsUpdate>,
) -> AppResult<impl IntoResponse> {
    state.admin.update_site_settings(update).await?;
    Ok(Message::ok("Site settings updated successfully!"))
}

/// Settings for page footers; readable without a session
pub async fn public_site_settings(State(state): State<AppState>) -> AppResult<Json<SiteSettings>> {
    Ok(Json(
        effective_settings(state.settings.as_ref(), state.clock.now()).await?,
    ))
}
