//! Server-side session document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PendingRegistration;

/// Everything the server remembers about one browser session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Identity claim set by login
    pub user_id: Option<Uuid>,
    pub logged_in_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub pending_registration: Option<PendingRegistration>,
    /// Most recently issued verification token
    pub email_token: Option<String>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self == &SessionData::default()
    }

    /// Drop the identity claim, keeping any in-flight registration
    pub fn logout(&mut self) {
        self.user_id = None;
        self.logged_in_at = None;
    }
}
