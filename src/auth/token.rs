use super::AuthError;
use bson::oid::ObjectId;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as hex.
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier for session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("lifetime_secs", &self.lifetime_secs).finish()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, lifetime_days: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs: i64::from(lifetime_days) * 86_400,
        }
    }

    /// # Errors
    /// Signing failures from `jsonwebtoken`.
    pub fn issue(&self, user: &ObjectId) -> Result<String, AuthError> {
        self.issue_at(user, chrono::Utc::now().timestamp())
    }

    /// # Errors
    /// Signing failures from `jsonwebtoken`.
    pub fn issue_at(&self, user: &ObjectId, iat: i64) -> Result<String, AuthError> {
        let claims = Claims { id: user.to_hex(), iat, exp: iat + self.lifetime_secs };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry and returns the user id the token names.
    ///
    /// # Errors
    /// `AuthError::Token` for bad or expired tokens, `NotAuthorized` for a malformed id.
    pub fn verify(&self, token: &str) -> Result<ObjectId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        ObjectId::parse_str(&data.claims.id).map_err(|_| AuthError::NotAuthorized)
    }
}
