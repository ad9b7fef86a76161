//! Opaque random values handed out as session ids, CSRF tokens and
//! verification tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{RngCore, rngs::OsRng};

/// Raw entropy per token before encoding.
pub const TOKEN_BYTES: usize = 32;

/// Generate a URL-safe token with 256 bits of entropy.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_decode_to_full_length() {
        let decoded = URL_SAFE_NO_PAD
            .decode(generate_token().as_bytes())
            .expect("token is base64url");
        assert_eq!(decoded.len(), TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_are_cookie_safe_and_distinct() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
