//! Double-submit CSRF protection
//!
//! The token travels twice: as a script-readable cookie and echoed back by
//! the client in the `X-CSRF-Token` header. A request passes when both are
//! present and identical.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;

use crate::{
    cookies::{CookieSettings, ResponseCookie},
    tokens::generate_token,
};

/// Name of the CSRF cookie.
pub const CSRF_COOKIE_NAME: &str = "__Host-csrf";

/// Header the client echoes the token in.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// CSRF cookie lifetime in seconds (15 minutes).
pub const CSRF_LIFETIME_SECS: i64 = 15 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF token header missing")]
    MissingCsrfHeader,

    #[error("CSRF token cookie missing")]
    MissingCsrfCookie,

    #[error("CSRF token mismatch")]
    CsrfMismatch,
}

#[derive(Debug, Clone, Copy)]
pub struct CsrfGuard {
    cookies: CookieSettings,
}

impl CsrfGuard {
    pub fn new(cookies: CookieSettings) -> Self {
        Self { cookies }
    }

    /// Fresh token and the cookie carrying it. The cookie is readable from
    /// script so the client can echo it.
    pub fn issue(&self) -> (String, ResponseCookie) {
        let token = generate_token();
        let cookie = ResponseCookie::new(
            self.cookies,
            CSRF_COOKIE_NAME,
            token.clone(),
            CSRF_LIFETIME_SECS,
            false,
        );
        (token, cookie)
    }

    /// Compare the header token with the cookie token.
    pub fn check(&self, headers: &HeaderMap, jar: &CookieJar) -> Result<(), CsrfError> {
        let header = headers
            .get(CSRF_HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(CsrfError::MissingCsrfHeader)?;

        let cookie = jar
            .get(CSRF_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(CsrfError::MissingCsrfCookie)?;

        if header != cookie {
            return Err(CsrfError::CsrfMismatch);
        }
        Ok(())
    }

    pub fn clear_cookie(&self) -> ResponseCookie {
        ResponseCookie::cleared(self.cookies, CSRF_COOKIE_NAME, false)
    }
}
