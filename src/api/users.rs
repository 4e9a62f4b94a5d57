//! Admin-only account management.

use super::auth::hash_off_thread;
use super::error::ApiError;
use super::extract::{JsonBody, ListParams};
use super::load;
use super::response::{created, model_json, ok};
use crate::auth::{Principal, authorize};
use crate::models::{self, Model, Role, User, UserInput};
use crate::results::materialize;
use crate::state::SharedState;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

const ADMINS: &[Role] = &[Role::Admin];

fn not_found(id: &str) -> String {
    format!("No user with the id of {id}")
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<SharedState>,
    principal: Principal,
    ListParams(query): ListParams,
) -> Result<Response, ApiError> {
    authorize(&principal, ADMINS)?;
    let envelope = materialize::<User>(&state.engine, None, &query);
    Ok(axum::Json(envelope).into_response())
}

async fn get_user(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&principal, ADMINS)?;
    let user: User = load(&state, &id, not_found)?;
    Ok(ok(model_json(&user)))
}

async fn create_user(
    State(state): State<SharedState>,
    principal: Principal,
    JsonBody(input): JsonBody<UserInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, ADMINS)?;
    let role = input.check_new(true)?;
    let hash = hash_off_thread(input.password.as_deref().unwrap_or_default()).await?;
    let user = User::new(&input, role, hash);
    models::create(&state.engine, &user)?;
    log::info!("user {} ({}) created by admin {}", user.id, user.role, principal.id());
    Ok(created(model_json(&user)))
}

async fn update_user(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UserInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, ADMINS)?;
    let mut user: User = load(&state, &id, not_found)?;
    user.apply(&input)?;
    models::save(&state.engine, &user)?;
    Ok(ok(model_json(&user)))
}

async fn delete_user(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&principal, ADMINS)?;
    let user: User = load(&state, &id, not_found)?;
    models::remove::<User>(&state.engine, &user.id)?;
    log::info!("user {} deleted by admin {}", user.id, principal.id());
    Ok(ok(json!({})))
}
