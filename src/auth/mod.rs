//! Credentials and access checks: password hashing, signed bearer tokens, reset tokens,
//! and the role and ownership policy.

pub mod password;
pub mod policy;
pub mod reset;
pub mod token;

pub use policy::{Principal, authorize, owns_or_admin};
pub use token::{Claims, TokenIssuer};

use crate::models::Role;
use bson::oid::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized to access this route")]
    NotAuthorized,

    #[error("Not authorized to access this route")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("User role {0} is not authorized to access this route")]
    Role(Role),

    #[error("User {user} is not authorized to {action} this {resource}")]
    NotOwner { user: ObjectId, action: &'static str, resource: &'static str },

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::Hash(e.to_string())
    }
}
