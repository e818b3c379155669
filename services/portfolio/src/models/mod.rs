//! Domain models

pub mod portfolio;
pub mod registration;
pub mod session;
pub mod site_settings;
pub mod user;

// Re-export for convenience
pub use portfolio::{Portfolio, PortfolioView};
pub use registration::{PendingRegistration, RegistrationForm, VerificationClaims};
pub use session::SessionData;
pub use site_settings::{SiteSettings, SiteSettingsUpdate};
pub use user::{LoginCredentials, NewUser, User, UserSummary};
