//! Site-wide footer and copyright settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_COMPANY_NAME: &str = "InfySkills";
pub const DEFAULT_COPYRIGHT_YEAR: &str = "2025";
pub const DEFAULT_COPYRIGHT_TEXT: &str = "© 2025 InfySkills. All rights reserved.";
pub const DEFAULT_FOOTER_TEXT: &str = "Powered by InfySkills Portfolio Builder";

/// The settings singleton
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SiteSettings {
    pub company_name: String,
    pub copyright_year: String,
    pub copyright_text: String,
    pub footer_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettings {
    /// Hardcoded fallback used whenever no row exists
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            copyright_year: DEFAULT_COPYRIGHT_YEAR.to_string(),
            copyright_text: DEFAULT_COPYRIGHT_TEXT.to_string(),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every field from `update`, falling back to the defaults for
    /// fields the update leaves out
    pub fn apply(&mut self, update: SiteSettingsUpdate, now: DateTime<Utc>) {
        self.company_name = update
            .company_name
            .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string());
        self.copyright_year = update
            .copyright_year
            .unwrap_or_else(|| DEFAULT_COPYRIGHT_YEAR.to_string());
        self.copyright_text = update
            .copyright_text
            .unwrap_or_else(|| DEFAULT_COPYRIGHT_TEXT.to_string());
        self.footer_text = update
            .footer_text
            .unwrap_or_else(|| DEFAULT_FOOTER_TEXT.to_string());
        self.updated_at = now;
    }
}

/// Settings update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteSettingsUpdate {
    pub company_name: Option<String>,
    pub copyright_year: Option<String>,
    pub copyright_text: Option<String>,
    pub footer_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_update_fields_fall_back_to_defaults() {
        let now = Utc::now();
        let mut settings = SiteSettings::defaults(now);
        settings.footer_text = "Custom footer".to_string();

        settings.apply(
            SiteSettingsUpdate {
                company_name: Some("Acme".to_string()),
                ..Default::default()
            },
            now,
        );

        assert_eq!(settings.company_name, "Acme");
        assert_eq!(settings.footer_text, DEFAULT_FOOTER_TEXT);
        assert_eq!(settings.copyright_year, DEFAULT_COPYRIGHT_YEAR);
    }
}
