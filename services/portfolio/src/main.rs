use anyhow::Result;
use sqlx::migrate::Migrator;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
};
use portfolio::{
    AppState, Backends,
    admin::seed_admin,
    clock::{Clock, SystemClock},
    config::{AppConfig, DEFAULT_ADMIN_PASSWORD},
    create_router,
    notification::gateway_from_config,
    presentation::HtmlPresenter,
    repositories::{PgCredentialStore, PgSettingsStore},
    session::RedisSessionStore,
    uploads::LocalUploadStore,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting portfolio service");

    let config = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool, &MIGRATOR).await?;

    // Sessions live in Redis
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    if !redis_pool.health_check().await.unwrap_or(false) {
        warn!("Redis is not reachable yet; sessions will fail until it is");
    }

    tokio::fs::create_dir_all(&config.upload_folder).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let users = Arc::new(PgCredentialStore::new(pool.clone()));

    if let Some(admin) = seed_admin(users.as_ref(), &config.admin_password, clock.now()).await? {
        info!("Created default admin account {}", admin.username);
        if config.mode.is_production() && config.admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("Admin account uses the default password; set ADMIN_PASSWORD");
        }
    }

    let backends = Backends {
        users,
        settings: Arc::new(PgSettingsStore::new(pool)),
        sessions: Arc::new(RedisSessionStore::new(
            redis_pool,
            config.session_lifetime_secs,
        )),
        uploads: Arc::new(LocalUploadStore::new(config.upload_folder.clone())),
        notifier: gateway_from_config(&config),
        presenter: Arc::new(HtmlPresenter),
        clock,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(config, backends));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Portfolio service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
