//! Portfolio editing, preview and public pages

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{Message, request_origin};
use crate::{
    admin::effective_settings,
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{PortfolioView, UserSummary},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/preview", post(preview))
        .route("/save_portfolio", post(save_portfolio))
        .route("/upload", post(upload))
        .route("/:username", get(public_page))
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: UserSummary,
    pub portfolio: Option<PortfolioView>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Dashboard>> {
    let portfolio = state.users.find_portfolio(user.id).await?;
    Ok(Json(Dashboard {
        user: UserSummary::from(&user),
        portfolio: portfolio.map(PortfolioView::from),
    }))
}

/// Body as JSON; anything unparseable counts as no data
fn json_body(body: &Bytes) -> AppResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected portfolio payload: {}", e);
        AppError::NoData
    })
}

/// Render the submitted fields without persisting them
pub async fn preview(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Html<String>> {
    let payload = json_body(&body)?;
    let origin = request_origin(&headers, &state.config);
    let settings = effective_settings(state.settings.as_ref(), state.clock.now()).await?;

    let html = state.reconciler.preview(&payload, &origin, &settings)?;
    Ok(Html(html))
}

pub async fn save_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let payload = json_body(&body)?;
    state.reconciler.save(user.id, &payload).await?;
    Ok(Message::ok("Portfolio saved successfully!"))
}

/// Store the multipart field `file` and return its public URL
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {}", e)))?;

        let filepath = state.uploads.store(user.id, &filename, &bytes).await?;
        info!("User {} uploaded {}", user.username, filepath);
        return Ok(Json(json!({
            "success": true,
            "filepath": filepath,
        })));
    }

    Err(AppError::Validation("No file part".to_string()))
}

/// The published portfolio of `username`
pub async fn public_page(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Html<String>> {
    let user = state
        .users
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let portfolio = state.users.find_portfolio(user.id).await?.ok_or_else(|| {
        AppError::NotFound("This user hasn't set up their portfolio yet.".to_string())
    })?;

    let settings = effective_settings(state.settings.as_ref(), state.clock.now()).await?;
    let html = state
        .presenter
        .render(portfolio.template_id, &portfolio, &settings)
        .map_err(|e| AppError::Render(e.to_string()))?;

    Ok(Html(html))
}
