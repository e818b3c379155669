//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    admin::AdminService,
    auth::AuthService,
    clock::Clock,
    config::AppConfig,
    notification::{Links, NotificationGateway},
    presentation::Presenter,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    reconciliation::Reconciler,
    recovery::RecoveryService,
    registration::RegistrationWorkflow,
    repositories::{CredentialStore, SettingsStore},
    session::SessionStore,
    token::TokenCodec,
    uploads::UploadStore,
};

/// The collaborators a running service is assembled from
pub struct Backends {
    pub users: Arc<dyn CredentialStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub presenter: Arc<dyn Presenter>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn CredentialStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub presenter: Arc<dyn Presenter>,
    pub auth: AuthService,
    pub registration: RegistrationWorkflow,
    pub recovery: RecoveryService,
    pub reconciler: Reconciler,
    pub admin: AdminService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let Backends {
            users,
            settings,
            sessions,
            uploads,
            notifier,
            presenter,
            clock,
        } = backends;

        let tokens = TokenCodec::new(&config.secret_key, clock.clone());
        let links = Links::new(&config.domain_url);

        Self {
            auth: AuthService::new(users.clone(), clock.clone()),
            registration: RegistrationWorkflow::new(
                users.clone(),
                tokens.clone(),
                notifier.clone(),
                links.clone(),
                clock.clone(),
            ),
            recovery: RecoveryService::new(users.clone(), tokens, notifier, links),
            reconciler: Reconciler::new(users.clone(), presenter.clone(), clock.clone()),
            admin: AdminService::new(users.clone(), settings.clone(), clock.clone()),
            rate_limiter: RateLimiter::new(RateLimiterConfig::default(), clock.clone()),
            config: Arc::new(config),
            clock,
            users,
            settings,
            sessions,
            uploads,
            presenter,
        }
    }
}
