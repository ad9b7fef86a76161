//! `Set-Cookie` construction shared by the session manager and the CSRF guard.

use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use std::fmt;
use tracing::error;

/// Deployment-wide cookie attributes.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Emit the `Secure` attribute. Disabled only for plain-HTTP development.
    pub secure: bool,
}

/// A cookie to be set (or cleared) on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: &'static str,
    pub value: String,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
}

impl ResponseCookie {
    pub fn new(
        settings: CookieSettings,
        name: &'static str,
        value: String,
        max_age_secs: i64,
        http_only: bool,
    ) -> Self {
        Self {
            name,
            value,
            max_age_secs,
            http_only,
            secure: settings.secure,
        }
    }

    /// A cookie that makes the browser drop `name` immediately.
    pub fn cleared(settings: CookieSettings, name: &'static str, http_only: bool) -> Self {
        Self::new(settings, name, String::new(), 0, http_only)
    }
}

impl fmt::Display for ResponseCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Path=/; Max-Age={}",
            self.name,
            self.value,
            self.max_age_secs.max(0)
        )?;
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        f.write_str("; SameSite=Lax")
    }
}

/// Render cookies into `Set-Cookie` headers, in order.
pub fn set_cookie_headers<I>(cookies: I) -> HeaderMap
where
    I: IntoIterator<Item = ResponseCookie>,
{
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => error!("Failed to encode cookie {}: {}", cookie.name, e),
        }
    }
    headers
}
