use super::error::ApiError;
use super::extract::{JsonBody, ListParams};
use super::load;
use super::response::{created, list, model_json, ok};
use crate::auth::{Principal, authorize, owns_or_admin};
use crate::models::review::refresh_average_rating;
use crate::models::{self, Bootcamp, Model, Review, ReviewInput, Role};
use crate::query::Filter;
use crate::results::{Populate, materialize, render};
use crate::state::SharedState;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

fn bootcamp_populate() -> Populate {
    Populate::forward("bootcamp", Bootcamp::COLLECTION).select(&["name", "description"])
}

fn not_found(id: &str) -> String {
    format!("No review with the id of {id}")
}

fn bootcamp_not_found(id: &str) -> String {
    format!("No bootcamp with the id of {id}")
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/reviews", get(list_reviews))
        .route("/reviews/:id", get(get_review).put(update_review).delete(delete_review))
        .route("/bootcamps/:id/reviews", get(list_bootcamp_reviews).post(create_review))
}

async fn list_reviews(
    State(state): State<SharedState>,
    ListParams(query): ListParams,
) -> Result<Response, ApiError> {
    let envelope = materialize::<Review>(&state.engine, Some(&bootcamp_populate()), &query);
    Ok(axum::Json(envelope).into_response())
}

async fn list_bootcamp_reviews(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = models::parse_id(&bootcamp_id)?;
    let reviews: Vec<Review> = models::find_all(&state.engine, &Filter::eq("bootcamp", id))?;
    Ok(list(reviews.iter().map(model_json).collect()))
}

async fn get_review(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let review: Review = load(&state, &id, not_found)?;
    let mut docs = [review.to_document()];
    bootcamp_populate().apply(&state.engine, &mut docs);
    Ok(ok(render(&docs[0], Review::HIDDEN)))
}

/// One review per user and bootcamp; the unique index rejects a second one.
async fn create_review(
    State(state): State<SharedState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, REVIEWERS)?;
    let bootcamp: Bootcamp = load(&state, &bootcamp_id, bootcamp_not_found)?;
    let review = Review::new(input, bootcamp.id, principal.id());
    models::create(&state.engine, &review)?;
    refresh_average_rating(&state.engine, &bootcamp.id)?;
    Ok(created(model_json(&review)))
}

async fn update_review(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, REVIEWERS)?;
    let mut review: Review = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &review.user, "update", "review")?;
    review.apply(input);
    models::save(&state.engine, &review)?;
    refresh_average_rating(&state.engine, &review.bootcamp)?;
    Ok(ok(model_json(&review)))
}

async fn delete_review(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&principal, REVIEWERS)?;
    let review: Review = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &review.user, "delete", "review")?;
    models::remove::<Review>(&state.engine, &review.id)?;
    refresh_average_rating(&state.engine, &review.bootcamp)?;
    Ok(ok(json!({})))
}
