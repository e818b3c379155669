//! Request middleware and session-aware extractors
//!
//! [`session_guard`] runs before every handler: it resolves the session
//! cookie, drops sessions whose user no longer exists and hands the session
//! document to handlers through the [`Session`] extractor.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderValue, StatusCode,
        header::{HOST, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    error::{AppError, AppResult},
    models::{SessionData, User},
    session::{SESSION_COOKIE, SessionStore, is_valid_session_id, new_session_id},
    state::AppState,
};

/// Session id and document resolved for the current request
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: String,
    pub data: SessionData,
}

/// Validate the session's identity claim and attach the session to the request
pub async fn session_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| is_valid_session_id(id));

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (new_session_id(), true),
    };

    let mut data = if fresh {
        SessionData::default()
    } else {
        state.sessions.load(&id).await?
    };

    if let Some(user_id) = data.user_id {
        match state.users.find_user_by_id(user_id).await? {
            Some(_) => {
                data.last_active = Some(state.clock.now());
                state.sessions.save(&id, &data).await?;
            }
            None => {
                // The whole session goes, pending registration included.
                warn!("Session refers to unknown user {}; clearing it", user_id);
                state.sessions.clear(&id).await?;
                data = SessionData::default();
            }
        }
    }

    req.extensions_mut().insert(SessionContext {
        id: id.clone(),
        data,
    });

    let mut response = next.run(req).await;

    if fresh {
        let cookie = Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(state.config.mode.is_production())
            .build();
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => error!("Failed to encode session cookie: {}", e),
        }
    }

    Ok(response)
}

/// Whether `host` (without port) passes the allow-list
pub fn host_allowed(allowed_hosts: &[String], host: &str) -> bool {
    allowed_hosts.is_empty()
        || host == "localhost"
        || allowed_hosts.iter().any(|allowed| allowed == "*" || allowed == host)
}

/// Reject requests whose Host header is not allow-listed
pub async fn host_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_string();

    if host_allowed(&state.config.allowed_hosts, &host) {
        next.run(req).await
    } else {
        warn!("Rejected request for host {}", host);
        (StatusCode::BAD_REQUEST, "Invalid host header").into_response()
    }
}

fn session_context(parts: &Parts) -> AppResult<SessionContext> {
    parts
        .extensions
        .get::<SessionContext>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session guard is not installed")))
}

/// The current session; handlers mutate `data` and call [`Session::save`]
pub struct Session {
    id: String,
    pub data: SessionData,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub async fn save(&self) -> AppResult<()> {
        self.store.save(&self.id, &self.data).await?;
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let context = session_context(parts)?;
        Ok(Session {
            id: context.id,
            data: context.data,
            store: state.sessions.clone(),
        })
    }
}

/// The logged-in user; anonymous requests are rejected with 401
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let context = session_context(parts)?;
        let user_id = context.data.user_id.ok_or(AppError::Unauthorized)?;
        let user = state
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// The logged-in administrator; members get 403
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_accepts_everything() {
        assert!(host_allowed(&[], "evil.example"));
    }

    #[test]
    fn allow_list_matches_exact_hosts_localhost_and_wildcard() {
        let allowed = vec!["folio.example".to_string()];
        assert!(host_allowed(&allowed, "folio.example"));
        assert!(host_allowed(&allowed, "localhost"));
        assert!(!host_allowed(&allowed, "evil.example"));
        assert!(host_allowed(&["*".to_string()], "evil.example"));
    }
}
