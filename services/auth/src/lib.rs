//! Session, credential and email-verification service for the student
//! council portal.
//!
//! Accounts register with a password and must confirm their email address
//! before they can log in. Logged-in browsers hold an opaque session cookie
//! whose 24 hour expiry slides on every authenticated request; a background
//! sweeper removes sessions that were left idle.

pub mod clock;
pub mod config;
pub mod cookies;
pub mod credentials;
pub mod csrf;
pub mod database;
pub mod error;
pub mod mailer;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod sweeper;
pub mod timestamp;
pub mod tokens;
pub mod validation;
pub mod verification;

pub use state::AppState;
