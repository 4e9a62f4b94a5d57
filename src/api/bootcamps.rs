use super::error::ApiError;
use super::extract::{JsonBody, ListParams};
use super::load;
use super::response::{created, list, model_json, ok};
use crate::auth::{Principal, authorize, owns_or_admin};
use crate::geo::EARTH_RADIUS_MILES;
use crate::models::{self, Bootcamp, BootcampInput, Course, Model, Role};
use crate::query::{Filter, FindOptions, find_docs};
use crate::results::{Populate, materialize, render};
use crate::state::{AppState, SharedState};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use serde_json::json;

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];
/// Slack above `max_file_upload` for multipart framing and the other form fields.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

fn courses_populate() -> Populate {
    Populate::reverse("courses", Course::COLLECTION, "bootcamp")
}

fn not_found(id: &str) -> String {
    format!("Bootcamp not found with id of {id}")
}

pub fn routes(state: &SharedState) -> Router<SharedState> {
    let upload_limit = state.config.max_file_upload.saturating_add(UPLOAD_OVERHEAD);
    Router::new()
        .route("/bootcamps", get(list_bootcamps).post(create_bootcamp))
        .route("/bootcamps/:id", get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp))
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps_in_radius))
        .route(
            "/bootcamps/:id/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
}

async fn list_bootcamps(
    State(state): State<SharedState>,
    ListParams(query): ListParams,
) -> Result<Response, ApiError> {
    let envelope = materialize::<Bootcamp>(&state.engine, Some(&courses_populate()), &query);
    Ok(axum::Json(envelope).into_response())
}

async fn get_bootcamp(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let bootcamp: Bootcamp = load(&state, &id, not_found)?;
    let mut docs = [bootcamp.to_document()];
    courses_populate().apply(&state.engine, &mut docs);
    Ok(ok(render(&docs[0], Bootcamp::HIDDEN)))
}

async fn create_bootcamp(
    State(state): State<SharedState>,
    principal: Principal,
    JsonBody(input): JsonBody<BootcampInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let mut bootcamp = Bootcamp::new(input, principal.id());
    bootcamp.locate(state.geocoder.as_ref());
    insert_bootcamp(&state, &principal, &bootcamp)?;
    log::info!("bootcamp {} created by {}", bootcamp.id, principal.id());
    Ok(created(model_json(&bootcamp)))
}

/// Inserts `bootcamp` unless its non-admin owner already has one.
fn insert_bootcamp(state: &AppState, principal: &Principal, bootcamp: &Bootcamp) -> Result<(), ApiError> {
    let _guard = state.publish_lock.lock();
    if principal.role() != Role::Admin {
        let existing: Option<Bootcamp> =
            models::find_one(&state.engine, &Filter::eq("user", principal.id()))?;
        if existing.is_some() {
            return Err(ApiError::BadRequest(format!(
                "The user with ID {} has already published a bootcamp",
                principal.id()
            )));
        }
    }
    models::create(&state.engine, bootcamp)?;
    Ok(())
}

async fn update_bootcamp(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<BootcampInput>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let mut bootcamp: Bootcamp = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &bootcamp.user, "update", "bootcamp")?;
    if bootcamp.apply(input) {
        bootcamp.locate(state.geocoder.as_ref());
    }
    models::save(&state.engine, &bootcamp)?;
    Ok(ok(model_json(&bootcamp)))
}

async fn delete_bootcamp(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let bootcamp: Bootcamp = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &bootcamp.user, "delete", "bootcamp")?;
    Bootcamp::delete_cascade(&state.engine, &bootcamp.id)?;
    log::info!("bootcamp {} deleted by {}", bootcamp.id, principal.id());
    Ok(ok(json!({})))
}

async fn bootcamps_in_radius(
    State(state): State<SharedState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let miles = distance
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid distance '{distance}'")))?;
    let center = state
        .geocoder
        .geocode(&zipcode)
        .ok_or_else(|| ApiError::NotFound(format!("No location found for zipcode {zipcode}")))?;
    let filter = Filter::GeoWithin {
        path: "location".into(),
        longitude: center.longitude,
        latitude: center.latitude,
        radius: miles / EARTH_RADIUS_MILES,
    };
    let col = state.engine.create_collection(Bootcamp::COLLECTION);
    let docs = find_docs(&col, &filter, &FindOptions::default());
    Ok(list(docs.iter().map(|d| render(d, Bootcamp::HIDDEN)).collect()))
}

/// File extension for the stored photo: the upload's own, else one derived from the MIME type.
fn photo_extension(file_name: Option<&str>, content_type: &str) -> String {
    file_name
        .and_then(|n| std::path::Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(
            || format!(".{}", content_type.trim_start_matches("image/").split(['+', ';']).next().unwrap_or("img")),
            |e| format!(".{}", e.to_ascii_lowercase()),
        )
}

async fn upload_photo(
    State(state): State<SharedState>,
    principal: Principal,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&principal, PUBLISHERS)?;
    let mut bootcamp: Bootcamp = load(&state, &id, not_found)?;
    owns_or_admin(&principal, &bootcamp.user, "update", "bootcamp")?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            upload = Some((content_type, file_name, field.bytes().await?));
            break;
        }
    }
    let Some((content_type, file_name, bytes)) = upload else {
        return Err(ApiError::BadRequest("Please upload a file".into()));
    };
    if !content_type.starts_with("image/") {
        return Err(ApiError::BadRequest("Please upload an image file".into()));
    }
    let max = state.config.max_file_upload;
    if bytes.len() > max {
        return Err(ApiError::BadRequest(format!("Please upload an image less than {max}")));
    }

    let name = format!("photo_{}{}", bootcamp.id, photo_extension(file_name.as_deref(), &content_type));
    let dir = &state.config.file_upload_path;
    let write = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&name), &bytes).await
    };
    if let Err(e) = write.await {
        log::error!("photo upload for bootcamp {}: {e}", bootcamp.id);
        return Err(ApiError::Server("Problem with file upload".into()));
    }
    bootcamp.photo.clone_from(&name);
    models::save(&state.engine, &bootcamp)?;
    log::info!("bootcamp {}: photo {name} ({} bytes)", bootcamp.id, bytes.len());
    Ok(ok(json!(name)))
}
