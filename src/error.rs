use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::config::AppEnv;
use crate::dto::common::{ApiResponse, FieldError};
use crate::utils::validation::field_errors;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Input that could not be decoded, reported against the offending fields.
    #[error("Invalid fields: {0:?}")]
    InvalidFields(Vec<FieldError>),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Server-side detail of a 500 response, attached to the response so
/// `expose_internal_errors` can surface it in development.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::InvalidFields(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Error::Validation(errs) => {
                let errors: Vec<FieldError> = field_errors(&errs);
                let body = ApiResponse::<()>::failure("Validation failed").with_errors(errors);
                (status, Json(body)).into_response()
            }
            Error::InvalidFields(errors) => {
                let body = ApiResponse::<()>::failure("Validation failed").with_errors(errors);
                (status, Json(body)).into_response()
            }
            Error::BadRequest(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg) => (status, Json(ApiResponse::<()>::failure(msg))).into_response(),
            other => {
                let detail = other.to_string();
                tracing::error!(error = %detail, "request failed");
                let mut resp = (
                    status,
                    Json(ApiResponse::<()>::failure("Internal Server Error")),
                )
                    .into_response();
                resp.extensions_mut().insert(InternalDetail(detail));
                resp
            }
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(err.to_string())
    }
}

pub async fn expose_internal_errors(
    State(app_env): State<AppEnv>,
    req: Request,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    if !app_env.is_development() {
        return resp;
    }
    let Some(InternalDetail(detail)) = resp.extensions().get::<InternalDetail>().cloned() else {
        return resp;
    };
    let mut body = ApiResponse::<()>::failure("Internal Server Error");
    body.error = Some(detail);
    (resp.status(), Json(body)).into_response()
}
