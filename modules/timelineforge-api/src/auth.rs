use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
/// Handlers that take this reject unauthenticated requests with 401.
pub struct AuthUser {
    pub id: Uuid,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::authentication("Authentication required"))?;

        let claims = state
            .jwt
            .verify_token(token)
            .map_err(|_| ApiError::authentication("Invalid authentication token"))?;

        let id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::authentication("Invalid authentication token"))?;

        Ok(AuthUser { id })
    }
}
