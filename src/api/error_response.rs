//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors raised by handlers themselves are request validation failures
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use std::time::Duration;

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_folder_path_not_found_into_response() {
        let response = Error::FolderPathNotFound("tok-9".into()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "folder_path_not_found");
        assert_eq!(api_error.error.details.unwrap()["token"], "tok-9");
    }

    #[tokio::test]
    async fn test_credential_unavailable_into_response() {
        let response = Error::CredentialUnavailable("token exchange failed".into()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(response).await.error.code, "credential_unavailable");
    }

    #[tokio::test]
    async fn test_listing_failure_into_response() {
        let response = Error::RemoteFolderListingFailed {
            path: "/P/X".into(),
            reason: RemoteError::Unauthorized.to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.details.unwrap()["path"], "/P/X");
    }

    #[tokio::test]
    async fn test_timeout_into_response() {
        let response = Error::Timeout(Duration::from_secs(300)).into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_of(response).await.error.details.unwrap()["timeout_secs"], 300);
    }

    #[tokio::test]
    async fn test_api_error_into_response_is_bad_request() {
        let response = ApiError::validation("missing path").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await.error.code, "validation_error");
    }
}
