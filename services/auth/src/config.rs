//! Service configuration loaded from environment variables

use anyhow::{Context, Result};
use config::{Config, Environment, Map};
use serde::Deserialize;

use crate::mailer::SmtpConfig;

/// Service settings
///
/// Every field maps to the upper-case environment variable of the same name,
/// e.g. `http_port` ← `HTTP_PORT`. Database settings are read separately by
/// [`common::database::DatabaseConfig::from_env`].
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http_port: u16,
    /// Emit the `Secure` cookie attribute
    pub secure_cookies: bool,
    /// Frontend origin, target of the post-verification redirect
    pub public_url: String,
    /// Public origin of this service, base of verification links
    pub domain: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_from: String,
    /// Upgrade the relay connection with STARTTLS. Off only for local relays
    /// such as mailpit.
    pub smtp_starttls: bool,
    pub student_mail_suffix: String,
    pub org_mail_suffix: String,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::default().try_parsing(true))
    }

    /// Load settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_source(vars: Map<String, String>) -> Result<Self> {
        Self::load(Environment::default().try_parsing(true).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self> {
        Config::builder()
            .set_default("http_port", 8080)?
            .set_default("secure_cookies", true)?
            .set_default("public_url", "http://localhost:5173")?
            .set_default("domain", "http://localhost:8080")?
            .set_default("smtp_port", 587)?
            .set_default("smtp_from", "noreply@fachschaftinformatik.de")?
            .set_default("smtp_starttls", true)?
            .set_default("student_mail_suffix", "@studmail.w-hs.de")?
            .set_default("org_mail_suffix", "@fachschaftinformatik.de")?
            .set_default("argon2_memory_kib", 19_456)?
            .set_default("argon2_iterations", 2)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// SMTP settings, `None` when no relay is configured.
    pub fn smtp(&self) -> Option<SmtpConfig> {
        let host = self.smtp_host.as_deref().filter(|host| !host.is_empty())?;
        Some(SmtpConfig {
            host: host.to_string(),
            port: self.smtp_port,
            username: self.smtp_user.clone(),
            password: self.smtp_pass.clone(),
            from: self.smtp_from.clone(),
            starttls: self.smtp_starttls,
        })
    }
}
