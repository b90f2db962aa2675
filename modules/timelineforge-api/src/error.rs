use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use timelineforge_common::ForgeError;

/// HTTP-facing error. Client mistakes map to 4xx with the real message;
/// everything else logs the cause and returns a generic 500 so internals
/// never leak to callers.
pub struct ApiError(ForgeError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self(ForgeError::Authentication(msg.into()))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self(ForgeError::Validation(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(ForgeError::NotFound(msg.into()))
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self(ForgeError::Upstream(msg.into()))
    }
}

impl From<ForgeError> for ApiError {
    fn from(err: ForgeError) -> Self {
        Self(err)
    }
}

impl From<timelineforge_store::StoreError> for ApiError {
    fn from(err: timelineforge_store::StoreError) -> Self {
        Self(ForgeError::Database(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ForgeError::Authentication(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ForgeError::Authorization(m) => (StatusCode::FORBIDDEN, m.clone()),
            ForgeError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ForgeError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred processing your request".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let resp = ApiError::validation("Query is required").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_are_generic() {
        let resp = ApiError::from(ForgeError::Database("connection reset".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_failures_are_masked_as_500() {
        let resp = ApiError::upstream("gemini timed out").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
