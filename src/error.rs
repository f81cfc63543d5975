//! Request-level error taxonomy.
//!
//! Every handler funnels failures through [`ApiError`] so that the wire
//! format is uniform: a JSON body of `{"error": "..."}` with the matching
//! status code. Internal failures never echo their detail string to the
//! client — the detail goes to the log, the client gets a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Errors a request handler can surface to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed field → 400.
    #[error("{0}")]
    Validation(String),

    /// Unique-constraint style collision → 409.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, bad token, deactivated account → 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// Target row does not exist → 404.
    #[error("{0}")]
    NotFound(String),

    /// Database or other unexpected failure → 500 with a generic body.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Log the detail; the client only sees a generic message.
            Self::Internal(source) => {
                tracing::error!("internal error: {source:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(e: r2d2::Error) -> Self {
        Self::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::unauthenticated("x").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_message_is_generic() {
        let err = ApiError::Internal(anyhow::anyhow!("secret detail: password=hunter2"));
        // Display for Internal never includes the source detail.
        assert_eq!(err.to_string(), "internal error");
    }
}
