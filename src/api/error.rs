use crate::auth::AuthError;
use crate::errors::DbError;
use crate::query::QueryParseError;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub const SERVER_ERROR: &str = "Server Error";

/// Every failure a handler can report. The body is always
/// `{ "success": false, "error": "<message>" }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Server(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn server() -> Self {
        Self::Server(SERVER_ERROR.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{} {self}", status.as_u16());
        } else {
            log::debug!("{} {self}", status.as_u16());
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidDocumentId(_) | DbError::NoSuchDocument(_) => {
                Self::NotFound("Resource not found".to_string())
            }
            DbError::DuplicateKey { fields, value } => {
                log::debug!("duplicate key {fields} = {value}");
                Self::BadRequest("Duplicate field value entered".to_string())
            }
            DbError::Validation(msgs) => Self::BadRequest(msgs.join(",")),
            other => {
                log::error!("store failure: {other}");
                Self::server()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotAuthorized | AuthError::Token(_) => Self::Unauthorized(e.to_string()),
            AuthError::Role(_) | AuthError::NotOwner { .. } => Self::Forbidden(e.to_string()),
            AuthError::Hash(msg) => {
                log::error!("password hashing: {msg}");
                Self::server()
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        log::error!("blocking task failed: {e}");
        Self::server()
    }
}

impl From<QueryParseError> for ApiError {
    fn from(e: QueryParseError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        log::error!("i/o failure: {e}");
        Self::server()
    }
}
