//! HTTP routes of the portfolio service

use axum::{
    Json, Router,
    http::{HeaderMap, header::HOST},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::AppConfig,
    middleware::{host_guard, session_guard},
    state::AppState,
    uploads::UPLOAD_URL_PREFIX,
};

pub mod admin;
pub mod auth;
pub mod email;
pub mod portfolio;

/// Create the router for the portfolio service
///
/// Layers run outside-in as: tracing, Host allow-list, session guard.
pub fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_folder);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth::router())
        .merge(email::router())
        .merge(admin::router())
        .merge(portfolio::router())
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .layer(middleware::from_fn_with_state(state.clone(), session_guard))
        .layer(middleware::from_fn_with_state(state.clone(), host_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "portfolio"
    }))
}

/// Success body shared by the JSON endpoints
#[derive(Debug, Serialize)]
pub struct Message {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

impl Message {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            redirect: None,
        })
    }

    pub fn redirect(message: impl Into<String>, to: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            redirect: Some(to),
        })
    }
}

/// Scheme and host the client used, for building absolute URLs
pub fn request_origin(headers: &HeaderMap, config: &AppConfig) -> String {
    let host = headers.get(HOST).and_then(|value| value.to_str().ok());
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or(if config.mode.is_production() {
            "https"
        } else {
            "http"
        });

    match host {
        Some(host) if !host.is_empty() => format!("{}://{}", scheme, host),
        _ => config.domain_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_prefers_the_request_host() {
        let config = AppConfig::for_tests("secret");
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers, &config), "http://localhost:8000");

        headers.insert(HOST, HeaderValue::from_static("folio.example:8080"));
        assert_eq!(request_origin(&headers, &config), "http://folio.example:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers, &config), "https://folio.example:8080");
    }
}
