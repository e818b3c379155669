//! Registration held in the session until the email address is verified

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration form as submitted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub college_name: String,
    pub college_year: String,
    pub course_stream: String,
}

impl RegistrationForm {
    /// Copy with surrounding whitespace removed from every field but the password
    pub fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password,
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            college_name: self.college_name.trim().to_string(),
            college_year: self.college_year.trim().to_string(),
            course_stream: self.course_stream.trim().to_string(),
        }
    }
}

/// Payload signed into an `email-confirm` token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationClaims {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub college_name: String,
    pub college_year: String,
    pub course_stream: String,
}

/// A registration that has not yet become a durable account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRegistration {
    pub username: String,
    pub password_hash: String,
    /// Plaintext password, kept only until the credentials email is sent
    pub original_password: String,
    pub email: String,
    pub phone: String,
    pub college_name: String,
    pub college_year: String,
    pub course_stream: String,
    pub email_verified: bool,
    pub email_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn claims(&self) -> VerificationClaims {
        VerificationClaims {
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            college_name: self.college_name.clone(),
            college_year: self.college_year.clone(),
            course_stream: self.course_stream.clone(),
        }
    }

    /// Whether a verification token was minted for this very registration
    pub fn matches(&self, claims: &VerificationClaims) -> bool {
        self.username == claims.username && self.email == claims.email
    }

    /// College details folded into a bio line, `None` when none were given
    pub fn education_bio(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("College", &self.college_name),
            ("Year", &self.college_year),
            ("Course", &self.course_stream),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending() -> PendingRegistration {
        let now = Utc::now();
        PendingRegistration {
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            original_password: "pw123456".to_string(),
            email: "a@x.com".to_string(),
            phone: String::new(),
            college_name: String::new(),
            college_year: String::new(),
            course_stream: String::new(),
            email_verified: false,
            email_token: "token".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(15),
        }
    }

    #[test]
    fn education_bio_joins_present_parts() {
        let mut reg = pending();
        assert_eq!(reg.education_bio(), None);

        reg.college_name = "MIT".to_string();
        reg.course_stream = "CS".to_string();
        assert_eq!(
            reg.education_bio().as_deref(),
            Some("College: MIT | Course: CS")
        );
    }

    #[test]
    fn expiry_is_exclusive_of_the_deadline() {
        let reg = pending();
        assert!(!reg.is_expired(reg.expires_at));
        assert!(reg.is_expired(reg.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn claims_match_on_username_and_email() {
        let reg = pending();
        let mut claims = reg.claims();
        assert!(reg.matches(&claims));

        claims.username = "mallory".to_string();
        assert!(!reg.matches(&claims));
    }
}
