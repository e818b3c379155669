//! Registration, login and account recovery endpoints

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::Message;
use crate::{
    error::{AppError, AppResult},
    middleware::Session,
    models::{LoginCredentials, RegistrationForm},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
        .route("/forgot-username", post(forgot_username))
        .route("/forgot-password", post(forgot_password))
        .route(
            "/reset-password/:token",
            get(check_reset_token).post(reset_password),
        )
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub email_sent: bool,
    pub redirect: &'static str,
}

/// Start a registration; the account exists only after email verification
pub async fn register(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<RegistrationForm>,
) -> AppResult<Json<RegisterResponse>> {
    let outcome = state.registration.submit(&mut session.data, form).await?;
    session.save().await?;

    let message = if outcome.email_sent {
        "Verification email sent. Please check your inbox."
    } else {
        "Verification email sending failed. Check logs for fallback link."
    };

    Ok(Json(RegisterResponse {
        success: true,
        message,
        email_sent: outcome.email_sent,
        redirect: "/verify",
    }))
}

/// Rate limiter key for a login attempt
fn login_key(username: &str) -> String {
    format!("login:{}", username.trim().to_lowercase())
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(credentials): Form<LoginCredentials>,
) -> AppResult<impl IntoResponse> {
    let key = login_key(&credentials.username);
    if !state.rate_limiter.is_allowed(&key).await {
        return Err(AppError::RateLimited);
    }

    let user = state.auth.login(&mut session.data, &credentials).await?;
    session.save().await?;
    state.rate_limiter.reset(&key).await;

    let redirect = if user.is_admin { "/admin" } else { "/dashboard" };
    Ok(Message::redirect("Login successful.", redirect))
}

pub async fn logout(State(state): State<AppState>, mut session: Session) -> AppResult<impl IntoResponse> {
    state.auth.logout(&mut session.data);
    session.save().await?;
    Ok(Message::redirect("You have been logged out.", "/"))
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

fn recovery_key(kind: &str, email: &str) -> String {
    format!("{}:{}", kind, email.trim().to_lowercase())
}

pub async fn forgot_username(
    State(state): State<AppState>,
    Form(form): Form<EmailForm>,
) -> AppResult<impl IntoResponse> {
    if !state
        .rate_limiter
        .is_allowed(&recovery_key("forgot-username", &form.email))
        .await
    {
        return Err(AppError::RateLimited);
    }

    let notice = state.recovery.forgot_username(&form.email).await?;
    Ok(Message::redirect(notice, "/"))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<EmailForm>,
) -> AppResult<impl IntoResponse> {
    if !state
        .rate_limiter
        .is_allowed(&recovery_key("forgot-password", &form.email))
        .await
    {
        return Err(AppError::RateLimited);
    }

    let notice = state.recovery.forgot_password(&form.email).await?;
    Ok(Message::redirect(notice, "/"))
}

/// Confirm a reset link is usable before showing the new password form
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = state.recovery.check_reset_token(&token).await?;
    Ok(Json(json!({
        "success": true,
        "username": user.username,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> AppResult<impl IntoResponse> {
    state
        .recovery
        .reset_password(&token, &form.password, &form.confirm_password)
        .await?;
    info!("Password reset completed");
    Ok(Message::redirect(
        "Your password has been reset successfully. You can now log in.",
        "/",
    ))
}
