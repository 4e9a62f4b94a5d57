//! Request extractors: the authenticated principal, list query parameters, JSON bodies.

use super::error::ApiError;
use crate::auth::{AuthError, Principal};
use crate::models::{self, User};
use crate::query::{ListQuery, parse_pairs};
use crate::state::SharedState;
use axum::extract::{FromRequest, FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

pub const TOKEN_COOKIE: &str = "token";

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }
    CookieJar::from_headers(&parts.headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty() && v != "none")
}

#[axum::async_trait]
impl FromRequestParts<SharedState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(AuthError::NotAuthorized)?;
        let id = state.tokens.verify(&token)?;
        let user: User = models::find_by_id(&state.engine, &id)?.ok_or(AuthError::NotAuthorized)?;
        Ok(Principal(user))
    }
}

/// The list grammar applied to the raw query string.
#[derive(Debug, Clone)]
pub struct ListParams(pub ListQuery);

#[axum::async_trait]
impl FromRequestParts<SharedState> for ListParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, ApiError> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        Ok(Self(parse_pairs(pairs, &state.page_defaults())?))
    }
}

/// `axum::Json` whose rejections render as the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
