//! Folio portfolio builder service
//!
//! Members register through an email-verified flow, edit a portfolio that is
//! previewed and saved against a fixed field schema, and publish it at
//! `/{username}`. Administrators manage members and the site footer.
//!
//! Storage, email delivery and page rendering sit behind traits so the router
//! can run against PostgreSQL/Redis/SMTP in production and in-memory stores
//! in tests.

pub mod admin;
pub mod auth;
pub mod clock;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notification;
pub mod password;
pub mod presentation;
pub mod rate_limiter;
pub mod reconciliation;
pub mod recovery;
pub mod registration;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod token;
pub mod uploads;
pub mod validation;

pub use routes::create_router;
pub use state::{AppState, Backends};
