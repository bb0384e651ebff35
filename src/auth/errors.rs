//! Authentication and account error types.
//!
//! Authentication failures (`NoToken`, `InvalidToken`, `Expired`) are kept
//! distinct here so they can be logged, but the HTTP layer renders all of
//! them the same way as `Forbidden`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session token in request")]
    NoToken,

    #[error("invalid session token")]
    InvalidToken,

    #[error("session token expired")]
    Expired,

    #[error("user already exists")]
    AlreadyExists,

    #[error("user does not exist")]
    NotExist,

    #[error("identifier must be a numeric id or a username")]
    InvalidIdentifierType,

    #[error("forbidden")]
    Forbidden,

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Hashing or backend failure. Detail is logged, never sent to clients.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        AuthError::MalformedRequest(reason.into())
    }

    /// True for the failures that come out of token extraction or verification.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NoToken | AuthError::InvalidToken | AuthError::Expired
        )
    }
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
