//! Password reset tokens. The raw token goes to the user; only its sha256 is stored.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let mut h = Sha256::new();
    h.update(input.as_bytes());
    hex::encode(h.finalize())
}

/// A fresh reset token: `(raw, hashed, expires_at)`.
#[must_use]
pub fn generate() -> (String, String, DateTime<Utc>) {
    let raw = hex::encode(rand::random::<[u8; 20]>());
    let hashed = sha256_hex(&raw);
    (raw, hashed, Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES))
}
