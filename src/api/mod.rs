//! HTTP surface: `/api/v1` resource routes, uploaded photos under `/uploads`, and the
//! server loop.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod error;
pub mod extract;
pub mod response;
pub mod reviews;
pub mod users;

pub use error::ApiError;

use crate::logger::ACCESS_TARGET;
use crate::models::{self, Model};
use crate::state::SharedState;
use axum::Router;
use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Loads `raw` as an `M`. A malformed id is a generic 404; a well-formed but unknown
/// one gets the resource-specific message.
pub(crate) fn load<M: Model>(
    state: &SharedState,
    raw: &str,
    not_found: fn(&str) -> String,
) -> Result<M, ApiError> {
    let id = models::parse_id(raw)?;
    models::find_by_id(&state.engine, &id)?.ok_or_else(|| ApiError::NotFound(not_found(raw)))
}

/// Every route, with panic recovery, access logging and CORS applied.
pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .merge(bootcamps::routes(&state))
        .merge(courses::routes())
        .merge(reviews::routes())
        .merge(users::routes())
        .merge(auth::routes());

    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .nest("/api/v1", api)
        .nest_service("/uploads", ServeDir::new(&state.config.file_upload_path))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(access_log))
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("handler panicked: {detail}");
    ApiError::server().into_response()
}

/// One line per request on the access target, tagged with a request id that is also
/// echoed back as `x-request-id`.
async fn access_log(req: Request, next: Next) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let mut res = next.run(req).await;
    log::info!(
        target: ACCESS_TARGET,
        "{id} {method} {path} {} {}ms",
        res.status().as_u16(),
        started.elapsed().as_millis()
    );
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID, value);
    }
    res
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM, then flushes the store.
///
/// # Errors
/// Bind or accept-loop failures.
pub async fn serve(state: SharedState) -> std::io::Result<()> {
    let address = state.config.bind_addr();
    let listener = TcpListener::bind(&address).await?;
    log::info!("listening on {address}");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server shutting down");
    if let Err(e) = state.engine.flush() {
        log::error!("flush on shutdown: {e}");
    }
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = ctrl_c().await {
            log::error!("ctrl-c handler: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("received Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                log::info!("received SIGTERM");
            }
            Err(e) => {
                log::error!("SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
}
