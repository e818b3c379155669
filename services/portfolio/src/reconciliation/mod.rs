//! Portfolio reconciliation
//!
//! Client payloads are first reduced to the allow-listed fields of
//! [`schema::FIELDS`] ([`sanitize`]), then merged onto a base portfolio.
//! Preview merges over schema defaults and never touches storage; save merges
//! over the stored portfolio so fields absent from the payload keep their
//! current value.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{Portfolio, SiteSettings},
    presentation::Presenter,
    repositories::CredentialStore,
};

pub mod schema;

use schema::{FieldError, FieldValue, PortfolioField};

/// URL prefixes served by this application that previews must make absolute
const LOCAL_URL_PREFIXES: [&str; 2] = ["/uploads/", "/static/"];

/// A payload reduced to known fields with normalized values
#[derive(Debug, Default)]
pub struct CleanPayload {
    fields: Vec<(&'static PortfolioField, FieldValue)>,
}

impl CleanPayload {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field.name == name)
            .map(|(_, value)| value)
    }

    /// Write every field onto `portfolio`
    pub fn merge_into(&self, portfolio: &mut Portfolio) {
        for (field, value) in &self.fields {
            field.apply(portfolio, value.clone());
        }
    }
}

/// Keep only schema fields, normalizing each value
pub fn sanitize(payload: &Map<String, Value>) -> Result<CleanPayload, FieldError> {
    let mut clean = CleanPayload::default();

    for (key, raw) in payload {
        match schema::lookup(key) {
            Some(field) => clean.fields.push((field, field.normalize(raw)?)),
            None => debug!("Dropping unknown portfolio key {}", key),
        }
    }

    Ok(clean)
}

/// Prefix `origin` to URLs that point into the upload or static area
pub fn absolutize(url: &str, origin: &str) -> String {
    if LOCAL_URL_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
        format!("{}{}", origin.trim_end_matches('/'), url)
    } else {
        url.to_string()
    }
}

/// The payload as a non-empty JSON object
fn payload_object(payload: &Value) -> AppResult<&Map<String, Value>> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(AppError::NoData),
    }
}

/// Merges client edits into portfolios for preview and save
#[derive(Clone)]
pub struct Reconciler {
    users: Arc<dyn CredentialStore>,
    presenter: Arc<dyn Presenter>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            presenter,
            clock,
        }
    }

    /// Build the unsaved portfolio a preview shows
    pub fn preview_portfolio(&self, payload: &Value, origin: &str) -> AppResult<Portfolio> {
        let clean = sanitize(payload_object(payload)?)?;

        let mut portfolio = Portfolio::with_defaults(Uuid::nil(), self.clock.now());
        clean.merge_into(&mut portfolio);

        portfolio.profile_pic = absolutize(&portfolio.profile_pic, origin);
        portfolio.resume_file = absolutize(&portfolio.resume_file, origin);

        Ok(portfolio)
    }

    /// Render a preview page; nothing is persisted
    pub fn preview(
        &self,
        payload: &Value,
        origin: &str,
        settings: &SiteSettings,
    ) -> AppResult<String> {
        let portfolio = self.preview_portfolio(payload, origin)?;
        self.presenter
            .render(portfolio.template_id, &portfolio, settings)
            .map_err(|e| AppError::Render(e.to_string()))
    }

    /// Merge a payload onto the stored portfolio of `user_id` and persist it
    pub async fn save(&self, user_id: Uuid, payload: &Value) -> AppResult<Portfolio> {
        let map = match payload {
            Value::Object(map) => map,
            _ => return Err(AppError::NoData),
        };
        let clean = sanitize(map)?;

        let now = self.clock.now();
        let mut portfolio = match self.users.find_portfolio(user_id).await? {
            Some(existing) => existing,
            None => {
                info!("Creating portfolio for user {}", user_id);
                Portfolio::with_defaults(user_id, now)
            }
        };

        clean.merge_into(&mut portfolio);
        portfolio.user_id = user_id;
        portfolio.updated_at = now;

        let saved = self.users.save_portfolio(&portfolio).await?;
        info!(
            "Saved portfolio for user {} ({} fields)",
            user_id,
            clean.len()
        );
        Ok(saved)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        models::NewUser,
        presentation::{HtmlPresenter, RenderError},
        repositories::MemoryCredentialStore,
    };
    use chrono::Utc;
    use serde_json::json;

    struct FailingPresenter;

    impl Presenter for FailingPresenter {
        fn render(&self, _: i32, _: &Portfolio, _: &SiteSettings) -> Result<String, RenderError> {
            Err(RenderError::Template("boom".to_string()))
        }
    }

    fn reconciler(users: &MemoryCredentialStore) -> Reconciler {
        Reconciler::new(
            Arc::new(users.clone()),
            Arc::new(HtmlPresenter),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    async fn member(users: &MemoryCredentialStore) -> Uuid {
        let (user, _) = users
            .create_user_with_portfolio(
                &NewUser {
                    username: "alice".to_string(),
                    email: "a@x.com".to_string(),
                    phone: None,
                    password_hash: "hash".to_string(),
                    is_admin: false,
                    created_at: Utc::now(),
                },
                Portfolio::with_defaults(Uuid::nil(), Utc::now()),
            )
            .await
            .unwrap();
        user.id
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn sanitize_drops_unknown_and_protected_keys() {
        let clean = sanitize(&object(json!({
            "full_name": "Ada",
            "id": "00000000-0000-0000-0000-000000000000",
            "user_id": "someone-else",
            "is_admin": true,
            "__class__": "x"
        })))
        .unwrap();

        assert_eq!(clean.len(), 1);
        assert_eq!(clean.get("full_name"), Some(&FieldValue::Text("Ada".to_string())));
    }

    #[test]
    fn sanitize_normalizes_skills() {
        let clean = sanitize(&object(json!({"skills": ["A", "B"]}))).unwrap();
        let Some(FieldValue::Text(stored)) = clean.get("skills") else {
            panic!("skills missing");
        };
        assert_eq!(schema::decode_skills(stored), vec!["A", "B"]);

        let clean = sanitize(&object(json!({"skills": "not json"}))).unwrap();
        let Some(FieldValue::Text(stored)) = clean.get("skills") else {
            panic!("skills missing");
        };
        assert!(schema::decode_skills(stored).is_empty());
    }

    #[test]
    fn absolutize_only_touches_local_urls() {
        assert_eq!(
            absolutize("/uploads/a.png", "http://host:8000/"),
            "http://host:8000/uploads/a.png"
        );
        assert_eq!(
            absolutize("/static/x.svg", "http://host"),
            "http://host/static/x.svg"
        );
        assert_eq!(absolutize("https://cdn/x.png", "http://host"), "https://cdn/x.png");
        assert_eq!(absolutize("#", "http://host"), "#");
    }

    #[tokio::test]
    async fn preview_merges_over_defaults_not_saved_state() {
        let users = MemoryCredentialStore::new();
        let reconciler = reconciler(&users);
        let user_id = member(&users).await;
        reconciler
            .save(user_id, &json!({"job_title": "Saved Title"}))
            .await
            .unwrap();

        let preview = reconciler
            .preview_portfolio(
                &json!({"full_name": "X", "profile_pic": "/uploads/me.png"}),
                "http://localhost:8000",
            )
            .unwrap();
        assert_eq!(preview.full_name, "X");
        assert_eq!(preview.job_title, "Your Job Title");
        assert_eq!(preview.profile_pic, "http://localhost:8000/uploads/me.png");
        assert_eq!(preview.template_id, 1);
    }

    #[tokio::test]
    async fn preview_requires_data() {
        let users = MemoryCredentialStore::new();
        let reconciler = reconciler(&users);
        let settings = SiteSettings::defaults(Utc::now());

        for payload in [json!({}), json!(null), json!([1, 2])] {
            let result = reconciler.preview(&payload, "http://h", &settings);
            assert!(matches!(result, Err(AppError::NoData)));
        }
    }

    #[tokio::test]
    async fn preview_surfaces_render_failures() {
        let users = MemoryCredentialStore::new();
        let settings = SiteSettings::defaults(Utc::now());

        let reconciler = Reconciler::new(
            Arc::new(users.clone()),
            Arc::new(FailingPresenter),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let result = reconciler.preview(&json!({"full_name": "X"}), "http://h", &settings);
        assert!(matches!(result, Err(AppError::Render(msg)) if msg.contains("boom")));

        let html = self::reconciler(&users)
            .preview(&json!({"full_name": "X", "template_id": "2"}), "http://h", &settings)
            .unwrap();
        assert!(html.contains("X"));
    }

    #[tokio::test]
    async fn save_keeps_fields_missing_from_the_payload() {
        let users = MemoryCredentialStore::new();
        let reconciler = reconciler(&users);
        let user_id = member(&users).await;

        reconciler.save(user_id, &json!({"job_title": "Y"})).await.unwrap();
        let saved = reconciler
            .save(user_id, &json!({"full_name": "X", "user_id": Uuid::new_v4()}))
            .await
            .unwrap();

        assert_eq!(saved.full_name, "X");
        assert_eq!(saved.job_title, "Y");
        assert_eq!(saved.user_id, user_id);
        assert_eq!(users.find_portfolio(user_id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn save_creates_missing_portfolio_from_defaults() {
        let users = MemoryCredentialStore::new();
        let reconciler = reconciler(&users);
        let user = users
            .create_user(&NewUser {
                username: "bob".to_string(),
                email: "b@x.com".to_string(),
                phone: None,
                password_hash: "hash".to_string(),
                is_admin: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let saved = reconciler
            .save(user.id, &json!({"skills": ["Rust"]}))
            .await
            .unwrap();
        assert_eq!(saved.skill_list(), vec!["Rust"]);
        assert_eq!(saved.full_name, "Your Name");
    }

    #[tokio::test]
    async fn save_rejects_structured_text_without_writing() {
        let users = MemoryCredentialStore::new();
        let reconciler = reconciler(&users);
        let user_id = member(&users).await;
        let before = users.find_portfolio(user_id).await.unwrap();

        let result = reconciler
            .save(user_id, &json!({"full_name": "X", "bio": {"a": 1}}))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(users.find_portfolio(user_id).await.unwrap(), before);
    }
}
