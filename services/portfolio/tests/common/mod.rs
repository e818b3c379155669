#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use portfolio::{
    AppState, Backends,
    clock::ManualClock,
    config::AppConfig,
    create_router,
    models::{NewUser, User},
    notification::MemoryOutbox,
    password::hash_password,
    presentation::HtmlPresenter,
    repositories::{CredentialStore, MemoryCredentialStore, MemorySettingsStore},
    session::{MemorySessionStore, SESSION_COOKIE},
    uploads::LocalUploadStore,
};

pub const PASSWORD: &str = "secret123";

/// The full router over in-memory backends, plus handles to inspect them
pub struct TestApp {
    pub router: Router,
    pub users: MemoryCredentialStore,
    pub settings: MemorySettingsStore,
    pub sessions: MemorySessionStore,
    pub outbox: MemoryOutbox,
    pub clock: ManualClock,
    pub config: AppConfig,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_tests("integration-secret");
    config.upload_folder = std::env::temp_dir().join(format!("folio-test-{}", Uuid::new_v4()));
    config
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = MemoryCredentialStore::new();
        let settings = MemorySettingsStore::new();
        let sessions = MemorySessionStore::new();
        let outbox = MemoryOutbox::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());

        let backends = Backends {
            users: Arc::new(users.clone()),
            settings: Arc::new(settings.clone()),
            sessions: Arc::new(sessions.clone()),
            uploads: Arc::new(LocalUploadStore::new(config.upload_folder.clone())),
            notifier: Arc::new(outbox.clone()),
            presenter: Arc::new(HtmlPresenter),
            clock: Arc::new(clock.clone()),
        };
        let router = create_router(AppState::new(config.clone(), backends));

        Self {
            router,
            users,
            settings,
            sessions,
            outbox,
            clock,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, cookie, None, Body::empty()))
            .await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, cookie, None, Body::empty()))
            .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        self.send(request(
            Method::POST,
            uri,
            cookie,
            Some("application/x-www-form-urlencoded"),
            Body::from(form_body(fields)),
        ))
        .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(request(
            Method::POST,
            uri,
            cookie,
            Some("application/json"),
            Body::from(body.to_string()),
        ))
        .await
    }

    /// Insert a user directly into the store
    pub async fn create_user(&self, username: &str, is_admin: bool) -> User {
        self.users
            .create_user(&NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                phone: None,
                password_hash: hash_password(PASSWORD).unwrap(),
                is_admin,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    /// Log in through the HTTP endpoint and return the session cookie
    pub async fn login(&self, username: &str) -> String {
        let path = if self.users.find_user_by_username(username).await.unwrap().unwrap().is_admin {
            "/admin/login"
        } else {
            "/login"
        };
        let response = self
            .post_form(path, None, &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

fn request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost:8000");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

/// `application/x-www-form-urlencoded` encoding for simple test values
fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            let v = v
                .replace('%', "%25")
                .replace('&', "%26")
                .replace('+', "%2B")
                .replace(' ', "+");
            format!("{}={}", k, v)
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `name=value` of the session cookie a response sets, if any
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", SESSION_COOKIE)))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// The path (`/verify_email/...` or `/reset-password/...`) of the first link
/// in `body` containing `marker`
pub fn link_path(body: &str, marker: &str) -> String {
    let start = body.find(marker).expect("mail contains the link");
    body[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}
