//! Invitation token codec.
//!
//! Tokens are bearer credentials: 32 bytes from the thread CSPRNG, hex-encoded
//! to 64 lowercase characters. Validation is purely syntactic and never
//! consults storage.

use rand::RngCore;

/// Number of random bytes behind a token.
pub const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token.
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Generate a new invitation token.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns true iff `token` is exactly 64 lowercase hex characters.
pub fn is_valid(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
