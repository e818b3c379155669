//! Email verification endpoints of the registration flow

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use super::Message;
use crate::{
    error::{AppError, AppResult},
    middleware::Session,
    registration::{ResendOutcome, VerificationStatus},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", get(verification_status))
        .route("/api/verification-status", get(verification_status))
        .route("/verify_email/:token", get(verify_email))
        .route("/resend_verification", post(resend_verification))
        .route("/debug/email-config", get(email_config))
}

/// The pending registration shown on the verification page
pub async fn verification_status(
    State(state): State<AppState>,
    mut session: Session,
) -> AppResult<Json<VerificationStatus>> {
    let status = state.registration.status(&mut session.data);
    // An expired registration is discarded from the session.
    session.save().await?;
    Ok(Json(status?))
}

/// Verify the emailed token and create the account
pub async fn verify_email(
    State(state): State<AppState>,
    mut session: Session,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    let result = state.registration.verify_email(&mut session.data, &token).await;
    session.save().await?;
    result?;

    Ok(Message::redirect(
        "Your account has been created successfully! Please log in.",
        "/",
    ))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    mut session: Session,
) -> AppResult<impl IntoResponse> {
    let result = state.registration.resend_verification(&mut session.data).await;
    session.save().await?;

    let message = match result? {
        ResendOutcome::AlreadyVerified => "Email already verified.",
        ResendOutcome::Sent { email_sent: true } => "Verification email resent.",
        ResendOutcome::Sent { email_sent: false } => {
            "Verification email sending failed. Check logs for fallback link."
        }
    };
    Ok(Message::ok(message))
}

/// Which SMTP settings are present; secrets are reported only as set/unset
pub async fn email_config(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    if state.config.mode.is_production() {
        return Err(AppError::Forbidden);
    }

    let smtp = &state.config.smtp;
    Ok(Json(json!({
        "SMTP_SERVER": smtp.server,
        "SMTP_USERNAME": smtp.username,
        "SMTP_PASSWORD_SET": smtp.password.is_some(),
        "SMTP_FROM": smtp.from,
        "SMTP_PORT": smtp.port,
        "DOMAIN_URL": state.config.domain_url,
        "ALL_CONFIGURED": smtp.is_configured(),
    })))
}
