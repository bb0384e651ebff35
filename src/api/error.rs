//! Mapping of `AuthError` onto HTTP responses.

use crate::auth::errors::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // One body for every authentication and authorization failure
            AuthError::NoToken
            | AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AuthError::AlreadyExists => (StatusCode::CONFLICT, "User already exists".to_string()),
            AuthError::NotExist => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AuthError::InvalidIdentifierType => (
                StatusCode::BAD_REQUEST,
                "Identifier must be a numeric id or a username".to_string(),
            ),
            AuthError::MalformedRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            AuthError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_authentication_failures_look_identical() {
        let expected = body_of(AuthError::Forbidden).await;
        for err in [AuthError::NoToken, AuthError::InvalidToken, AuthError::Expired] {
            assert_eq!(body_of(err).await, expected);
        }
        assert_eq!(expected.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) = body_of(anyhow::anyhow!("backend path /var/db locked").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("/var/db"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::AlreadyExists.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::NotExist.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::InvalidIdentifierType.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::malformed("bad json").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
