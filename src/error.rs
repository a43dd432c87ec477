use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type AppResult<T> = Result<T, ApiError>;

/// Failure taxonomy for every HTTP handler and the websocket handshake.
///
/// Internal errors keep their `anyhow` cause for the log but only ever
/// surface a generic code to the caller.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Validation(String),
    AccessDenied,
    NotFound(&'static str),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_owned()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::AccessDenied => (StatusCode::FORBIDDEN, "access_denied".to_owned()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what.to_owned()),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error".to_owned())
            }
        };

        (status, Json(json!({ "error": code }))).into_response()
    }
}

macro_rules! internal_impl {
    ($E:ty) => {
        impl From<$E> for ApiError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

internal_impl!(anyhow::Error);
internal_impl!(sqlx::Error);
internal_impl!(serde_json::Error);
internal_impl!(tower_sessions::session::Error);
internal_impl!(axum::Error);
internal_impl!(uuid::Error);
