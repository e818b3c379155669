//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

/// Shortest password accepted at registration and reset
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reject empty or whitespace-only required fields
pub fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// First path segments served by fixed routes; a user with one of these
/// names would have an unreachable public page
pub const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "api",
    "dashboard",
    "debug",
    "forgot-password",
    "forgot-username",
    "health",
    "login",
    "logout",
    "preview",
    "register",
    "resend_verification",
    "reset-password",
    "save_portfolio",
    "static",
    "upload",
    "uploads",
    "verify",
    "verify_email",
];

/// Validate username
///
/// Usernames double as public page paths, so they are restricted to a
/// URL-safe alphabet.
pub fn validate_username(username: &str) -> AppResult<()> {
    require("Username", username)?;

    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(AppError::Validation(format!(
            "Username '{}' is reserved",
            username
        )));
    }

    if username.len() > 80 {
        return Err(AppError::Validation(
            "Username must be at most 80 characters long".to_string(),
        ));
    }

    static USERNAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").ok());

    match regex {
        Some(regex) if regex.is_match(username) => Ok(()),
        _ => Err(AppError::Validation(
            "Username can only contain letters, numbers, dots, dashes and underscores"
                .to_string(),
        )),
    }
}

/// Validate email
pub fn validate_email(email: &str) -> AppResult<()> {
    require("Email", email)?;

    if email.len() > 254 {
        return Err(AppError::Validation(
            "Email must be at most 254 characters long".to_string(),
        ));
    }

    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

    match regex {
        Some(regex) if regex.is_match(email) => Ok(()),
        _ => Err(AppError::Validation("Invalid email format".to_string())),
    }
}

/// Validate a new password and its confirmation
pub fn validate_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    Ok(())
}
