//! Service configuration
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file) and are read once at startup. The resulting [`AppConfig`] is a plain
//! snapshot handed to the components that need it; nothing re-reads the
//! environment per request.

use anyhow::{Result, bail};
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Deployment flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RunMode::Production,
            _ => RunMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }
}

/// SMTP transport settings
#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl SmtpSettings {
    /// Server, username and password are all present
    pub fn is_configured(&self) -> bool {
        self.server.is_some() && self.username.is_some() && self.password.is_some()
    }
}

/// Application configuration snapshot
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RunMode,
    /// Key for signing tokens
    pub secret_key: String,
    /// Public origin used in emailed links, without trailing slash
    pub domain_url: String,
    pub upload_folder: PathBuf,
    pub port: u16,
    pub session_lifetime_secs: u64,
    pub smtp: SmtpSettings,
    /// Password given to the seeded `admin` account
    pub admin_password: String,
    /// Host header allow-list; empty means every host is accepted
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    env: String,
    secret_key: Option<String>,
    domain_url: String,
    upload_folder: String,
    port: u16,
    session_lifetime_secs: u64,
    smtp_server: Option<String>,
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_from: String,
    admin_password: String,
    allowed_hosts: Option<String>,
}

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// # Environment Variables
    /// - `ENV`: `development` or `production` (default: development)
    /// - `SECRET_KEY`: token signing key (required in production)
    /// - `DOMAIN_URL`: public origin (default: `http://localhost:8000`)
    /// - `UPLOAD_FOLDER`: upload directory (default: `static/uploads`)
    /// - `PORT`: listen port (default: 8000)
    /// - `SESSION_LIFETIME_SECS`: session lifetime (default: 86400)
    /// - `SMTP_SERVER`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`,
    ///   `SMTP_FROM` (`no-reply@example.com`)
    /// - `ADMIN_PASSWORD`: seeded admin password (default: `admin123`)
    /// - `ALLOWED_HOSTS`: comma separated Host allow-list
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .set_default("env", "development")?
            .set_default("domain_url", "http://localhost:8000")?
            .set_default("upload_folder", "static/uploads")?
            .set_default("port", 8000)?
            .set_default("session_lifetime_secs", 86_400)?
            .set_default("smtp_port", 587)?
            .set_default("smtp_from", "no-reply@example.com")?
            .set_default("admin_password", DEFAULT_ADMIN_PASSWORD)?
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mode = RunMode::parse(&raw.env);

        let secret_key = match raw.secret_key.filter(|k| !k.is_empty()) {
            Some(key) => key,
            None if mode.is_production() => bail!("SECRET_KEY must be set in production"),
            None => {
                warn!("SECRET_KEY not set; using a per-process random key");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(48)
                    .map(char::from)
                    .collect()
            }
        };

        let allowed_hosts = match (raw.allowed_hosts, mode) {
            (Some(hosts), _) => hosts
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            (None, RunMode::Development) => Vec::new(),
            (None, RunMode::Production) => {
                let domain = raw
                    .domain_url
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                vec![domain, "localhost".to_string(), "127.0.0.1".to_string()]
            }
        };

        Ok(AppConfig {
            mode,
            secret_key,
            domain_url: raw.domain_url.trim_end_matches('/').to_string(),
            upload_folder: PathBuf::from(raw.upload_folder),
            port: raw.port,
            session_lifetime_secs: raw.session_lifetime_secs,
            smtp: SmtpSettings {
                server: raw.smtp_server.filter(|s| !s.is_empty()),
                port: raw.smtp_port,
                username: raw.smtp_username.filter(|s| !s.is_empty()),
                password: raw.smtp_password.filter(|s| !s.is_empty()),
                from: raw.smtp_from,
            },
            admin_password: raw.admin_password,
            allowed_hosts,
        })
    }

    /// A development configuration with fixed values, for tests and tooling
    pub fn for_tests(secret_key: &str) -> Self {
        AppConfig {
            mode: RunMode::Development,
            secret_key: secret_key.to_string(),
            domain_url: "http://localhost:8000".to_string(),
            upload_folder: std::env::temp_dir().join("folio-uploads"),
            port: 0,
            session_lifetime_secs: 86_400,
            smtp: SmtpSettings {
                port: 587,
                from: "no-reply@example.com".to_string(),
                ..SmtpSettings::default()
            },
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            allowed_hosts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ENV",
        "SECRET_KEY",
        "DOMAIN_URL",
        "SMTP_SERVER",
        "SMTP_USERNAME",
        "SMTP_PASSWORD",
        "SMTP_PORT",
        "ALLOWED_HOSTS",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_in_development() {
        clear_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.mode, RunMode::Development);
        assert_eq!(config.domain_url, "http://localhost:8000");
        assert_eq!(config.smtp.port, 587);
        assert!(!config.smtp.is_configured());
        assert_eq!(config.secret_key.len(), 48);
        assert!(config.allowed_hosts.is_empty());
    }

    #[test]
    #[serial]
    fn test_production_requires_secret_key() {
        clear_env();
        unsafe { std::env::set_var("ENV", "production") };

        assert!(AppConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_custom_values() {
        clear_env();
        unsafe {
            std::env::set_var("ENV", "production");
            std::env::set_var("SECRET_KEY", "s3cret");
            std::env::set_var("DOMAIN_URL", "https://folio.example.com/");
            std::env::set_var("SMTP_SERVER", "smtp.example.com");
            std::env::set_var("SMTP_USERNAME", "mailer");
            std::env::set_var("SMTP_PASSWORD", "hunter2");
            std::env::set_var("SMTP_PORT", "465");
        }

        let config = AppConfig::from_env().unwrap();
        assert!(config.mode.is_production());
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.domain_url, "https://folio.example.com");
        assert_eq!(config.smtp.port, 465);
        assert!(config.smtp.is_configured());
        assert_eq!(
            config.allowed_hosts,
            vec!["folio.example.com", "localhost", "127.0.0.1"]
        );

        clear_env();
    }
}
