//! Signed, purpose-bound, time-limited tokens
//!
//! Tokens are HS256 JWTs whose `aud` claim carries the purpose tag and whose
//! `iat` claim carries the issuance time. Nothing is stored server side: the
//! age check against a caller-supplied max age happens at verification.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;

use crate::clock::Clock;

/// What a token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailConfirm,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::EmailConfirm => "email-confirm",
            TokenPurpose::PasswordReset => "password-reset",
        }
    }

    /// How long a token of this purpose stays valid
    pub fn max_age(self) -> Duration {
        match self {
            TokenPurpose::EmailConfirm => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::hours(1),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    /// Bad signature, wrong purpose, or malformed payload
    #[error("token invalid")]
    Invalid,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    aud: String,
    iat: i64,
    data: T,
}

/// Issues and verifies tokens with one shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    /// Sign `payload` for `purpose`
    pub fn issue<T: Serialize>(&self, payload: &T, purpose: TokenPurpose) -> anyhow::Result<String> {
        let envelope = Envelope {
            aud: purpose.as_str().to_string(),
            iat: self.clock.now().timestamp(),
            data: payload,
        };

        let token = encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding_key)?;
        Ok(token)
    }

    /// Check signature, purpose and age, returning the payload
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        purpose: TokenPurpose,
        max_age: Duration,
    ) -> Result<T, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["aud".to_string()]);
        validation.set_audience(&[purpose.as_str()]);

        let envelope = decode::<Envelope<T>>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        let age = self.clock.now().timestamp() - envelope.iat;
        if age < 0 {
            return Err(TokenError::Invalid);
        }
        if age > max_age.num_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        email: String,
    }

    fn codec(clock: &ManualClock) -> TokenCodec {
        TokenCodec::new("test-secret", Arc::new(clock.clone()))
    }

    fn payload() -> Payload {
        Payload {
            email: "a@x.com".to_string(),
        }
    }

    #[test]
    fn round_trip_within_max_age() {
        let clock = ManualClock::new(Utc::now());
        let codec = codec(&clock);
        let token = codec.issue(&payload(), TokenPurpose::PasswordReset).unwrap();

        clock.advance(Duration::minutes(59));
        let decoded: Payload = codec
            .verify(&token, TokenPurpose::PasswordReset, Duration::hours(1))
            .unwrap();
        assert_eq!(decoded, payload());
    }

    #[test]
    fn expired_after_max_age() {
        let clock = ManualClock::new(Utc::now());
        let codec = codec(&clock);
        let token = codec.issue(&payload(), TokenPurpose::PasswordReset).unwrap();

        clock.advance(Duration::hours(1) + Duration::seconds(1));
        let result: Result<Payload, _> =
            codec.verify(&token, TokenPurpose::PasswordReset, Duration::hours(1));
        assert_eq!(result, Err(TokenError::Expired));
    }

    #[test]
    fn purpose_mismatch_is_invalid() {
        let clock = ManualClock::new(Utc::now());
        let codec = codec(&clock);
        let token = codec.issue(&payload(), TokenPurpose::EmailConfirm).unwrap();

        let result: Result<Payload, _> =
            codec.verify(&token, TokenPurpose::PasswordReset, Duration::hours(1));
        assert_eq!(result, Err(TokenError::Invalid));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let clock = ManualClock::new(Utc::now());
        let other = TokenCodec::new("another-secret", Arc::new(clock.clone()));
        let token = other.issue(&payload(), TokenPurpose::EmailConfirm).unwrap();

        let result: Result<Payload, _> =
            codec(&clock).verify(&token, TokenPurpose::EmailConfirm, Duration::hours(24));
        assert_eq!(result, Err(TokenError::Invalid));
        let garbage: Result<Payload, _> =
            codec(&clock).verify("not-a-token", TokenPurpose::EmailConfirm, Duration::hours(24));
        assert_eq!(garbage, Err(TokenError::Invalid));
    }
}
