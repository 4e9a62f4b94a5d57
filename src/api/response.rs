use super::error::ApiError;
use super::extract::TOKEN_COOKIE;
use crate::models::{Model, User};
use crate::results::render;
use crate::state::AppState;
use axum::Json;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

pub fn model_json<M: Model>(model: &M) -> Value {
    render(&model.to_document(), M::HIDDEN)
}

/// `{ success: true, data }` with status 200.
pub fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

pub fn created(data: Value) -> Response {
    (StatusCode::CREATED, Json(json!({ "success": true, "data": data }))).into_response()
}

/// `{ success: true, count, data }` for unpaginated lists.
pub fn list(data: Vec<Value>) -> Response {
    Json(json!({ "success": true, "count": data.len(), "data": data })).into_response()
}

fn cookie(value: &str, max_age_secs: u64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .map_err(|e| {
        log::error!("cookie header: {e}");
        ApiError::server()
    })
}

/// Issues a session token for `user`: `{ success: true, token }` plus the `token` cookie.
///
/// # Errors
/// Token signing failures.
pub fn token_response(state: &AppState, user: &User, status: StatusCode) -> Result<Response, ApiError> {
    let token = state.tokens.issue(&user.id)?;
    let max_age = u64::from(state.config.jwt_cookie_expire_days) * 86_400;
    let mut res = (status, Json(json!({ "success": true, "token": token }))).into_response();
    res.headers_mut().insert(SET_COOKIE, cookie(&token, max_age)?);
    Ok(res)
}

/// Overwrites the session cookie with one that expires in ten seconds.
///
/// # Errors
/// Only if the header cannot be built.
pub fn clear_token_response() -> Result<Response, ApiError> {
    let mut res = ok(json!({}));
    res.headers_mut().insert(SET_COOKIE, cookie("none", 10)?);
    Ok(res)
}
