use super::error::ApiError;
use super::extract::{JsonBody, ListParams};
use super::load;
use super::response::{created, list, model_json, ok};
use crate::auth::{Principal, authorize, owns_or_admin};
use crate::models::course::refresh_average_cost;
use crate::models::{self, Bootcamp, Course, CourseInput, Model, Role};
use crate::query::Filter;
use crate::results::{Populate, materialize, render};
use crate::state::SharedState;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

fn bootcamp_populate() -> Populate {
    Populate::forward("bootcamp", Bootcamp::COLLECTION).select(&["name", "description"])
}

fn not_found(id: &str) -> String {
    format!("No course with the id of {id}")
}

fn bootcamp_not_found(id: &str) -> String {
    format!("No bootcamp with the id of {id}")
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/:id", get(get_course).put(update_course).delete(delete_course))
        .route("/bootcamps/:id/courses", get(list_bootcamp_courses).post(create_course))
}

async fn list_courses(
    State(state): State<SharedState>,
    ListParams(query): ListParams,
) -> Result<Response, ApiError> {
    let envelope = materialize::<Course>(&state.engine, Some(&bootcamp_populate()), &query);
    Ok(axum::Json(envelope).into_response())
}

/// Every course of one bootcamp, unpaginated.
async fn list_bootcamp_courses(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = models::parse_id(&bootcamp_id)?;
    let courses: Vec<Course> = models::find_all(&state.engine, &Filter::eq("bootcamp", id))?;
    Ok(list(courses.iter().map(model_json).collect()))
}

async fn get_course(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let course: Course = load(&state, &id, not_found)?;
    let mut docs = [course.to_document()];
    bootcamp_populate().apply(&state.engine, &mut docs);
    Ok(ok(render(&docs[0], Course::HIDDEN)))
}

async fn create_course(
    State(state): State<SharedState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    JsonBody(input): JsonBody<CourseInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let bootcamp: Bootcamp = load(&state, &bootcamp_id, bootcamp_not_found)?;
    owns_or_admin(&principal, &bootcamp.user, "add a course to", "bootcamp")?;
    let course = Course::new(input, bootcamp.id, principal.id());
    models::create(&state.engine, &course)?;
    refresh_average_cost(&state.engine, &bootcamp.id)?;
    Ok(created(model_json(&course)))
}

async fn update_course(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<CourseInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let mut course: Course = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &course.user, "update", "course")?;
    course.apply(input);
    models::save(&state.engine, &course)?;
    refresh_average_cost(&state.engine, &course.bootcamp)?;
    Ok(ok(model_json(&course)))
}

async fn delete_course(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let course: Course = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &course.user, "delete", "course")?;
    models::remove::<Course>(&state.engine, &course.id)?;
    refresh_average_cost(&state.engine, &course.bootcamp)?;
    Ok(ok(json!({})))
}
