use super::AuthError;
use crate::models::{Role, User};
use bson::oid::ObjectId;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal(pub User);

impl Principal {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.0.role
    }
}

/// # Errors
/// `AuthError::Role` when the caller's role is not in `allowed`.
pub fn authorize(principal: &Principal, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&principal.role()) {
        Ok(())
    } else {
        Err(AuthError::Role(principal.role()))
    }
}

/// The single ownership rule for mutations: the owner or an admin may proceed.
///
/// # Errors
/// `AuthError::NotOwner` naming the caller, the attempted action and the resource.
pub fn owns_or_admin(
    principal: &Principal,
    owner: &ObjectId,
    action: &'static str,
    resource: &'static str,
) -> Result<(), AuthError> {
    if principal.role() == Role::Admin || principal.id() == *owner {
        Ok(())
    } else {
        Err(AuthError::NotOwner { user: principal.id(), action, resource })
    }
}
