//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Canonical form of an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }

    if trimmed.chars().count() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    if trimmed.chars().any(char::is_control) {
        return Err("Name must not contain control characters".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Ada@StudMail.W-HS.de \n"), "ada@studmail.w-hs.de");
    }

    #[test]
    fn test_accepts_plausible_addresses() {
        assert!(validate_email("ada@studmail.w-hs.de").is_ok());
        assert!(validate_email("first.last+tag@fachschaftinformatik.de").is_ok());
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email(&format!("{}@x.de", "a".repeat(260))).is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Ada Lovelace").is_ok());
        assert!(validate_name("Jürgen").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("bad\u{0}name").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }
}
