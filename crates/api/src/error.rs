use advisory_site_core::admin::AdminError;
use advisory_site_core::content::validate::{FieldError, ValidationErrors};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::pages::PageError;

/// Where unauthenticated admin requests are sent.
pub const LOGIN_PATH: &str = "/admin/login";

/// API error type mapped to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    /// The content store rejected or failed a write; the operator may retry.
    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(errors) => ApiError::Validation(errors),
            AdminError::NotFound(what) => ApiError::NotFound(what),
            AdminError::Conflict(what) => ApiError::Conflict(what),
            AdminError::Store(err) => ApiError::Store(err.to_string()),
        }
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut fields: Option<Vec<FieldError>> = None;
        let (status, error_type, message) = match self {
            ApiError::Unauthorized => return Redirect::to(LOGIN_PATH).into_response(),
            ApiError::Validation(errors) => {
                let message = errors
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Invalid input".to_string());
                fields = Some(errors.errors);
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", message)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Store(msg) => {
                tracing::warn!("Store write failed: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "storeUnavailable",
                    "The content store could not complete the request. Please try again."
                        .to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
            "statusCode": status.as_u16(),
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use advisory_site_core::store::StoreError;
    use axum::http::header::LOCATION;

    #[test]
    fn unauthorized_redirects_to_login() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], LOGIN_PATH);
    }

    #[test]
    fn admin_errors_map_to_statuses() {
        let cases = [
            (
                AdminError::Validation(ValidationErrors::single("section", "bad")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AdminError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AdminError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AdminError::Store(StoreError::Unavailable),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
