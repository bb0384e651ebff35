//! JWT Token Handler
//! Mission: Issue and verify session tokens signed with the shared settings key

use crate::auth::errors::{AuthError, Result};
use crate::auth::models::{SessionClaims, SessionUser, User};
use crate::settings::SharedSettings;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;

/// Fixed `iss` claim of every token this service signs.
pub const TOKEN_ISSUER: &str = "Filedesk";

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_HOURS: i64 = 2;

/// Remaining lifetime below which clients are told to renew.
pub const RENEWAL_THRESHOLD_HOURS: i64 = 1;

/// JWT Handler for token operations
#[derive(Clone, Debug)]
pub struct JwtHandler {
    settings: SharedSettings,
}

impl JwtHandler {
    pub fn new(settings: SharedSettings) -> Self {
        Self { settings }
    }

    /// Sign a token carrying a snapshot of the user's public fields.
    pub fn issue(&self, user: &User) -> Result<String> {
        self.issue_at(user, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance time.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let expiration = now
            .checked_add_signed(Duration::hours(TOKEN_LIFETIME_HOURS))
            .context("Invalid timestamp")?;

        let claims = SessionClaims {
            user: SessionUser::from_user(user),
            exp: expiration.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        let key = self.settings.signing_key();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&key),
        )
        .context("Failed to sign session token")?;

        debug!(
            user_id = user.id,
            exp = claims.exp,
            "Issued session token (expires in {}h)",
            TOKEN_LIFETIME_HOURS
        );

        Ok(token)
    }

    /// Check signature, issuer and expiry, and return the embedded claims.
    ///
    /// The claims are returned as signed; the live account is not consulted.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let key = self.settings.signing_key();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let decoded = decode::<SessionClaims>(token, &DecodingKey::from_secret(&key), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?;

        Ok(decoded.claims)
    }

    /// Whether the token should be replaced soon. Advisory only.
    pub fn needs_renewal(claims: &SessionClaims) -> bool {
        Self::needs_renewal_at(claims, Utc::now())
    }

    pub fn needs_renewal_at(claims: &SessionClaims, now: DateTime<Utc>) -> bool {
        let remaining = claims.exp - now.timestamp();
        remaining < Duration::hours(RENEWAL_THRESHOLD_HOURS).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{Permissions, ViewMode};
    use crate::settings::Settings;

    fn create_handler(secret: &str) -> JwtHandler {
        JwtHandler::new(SharedSettings::new(Settings::new(secret.as_bytes().to_vec())))
    }

    fn create_test_user() -> User {
        User {
            id: 42,
            username: "alice".to_string(),
            password: "hash".to_string(),
            scope: "/srv/alice".to_string(),
            locale: "de".to_string(),
            view_mode: ViewMode::Mosaic,
            perm: Permissions {
                download: true,
                ..Permissions::default()
            },
            commands: vec!["git".to_string(), "ls".to_string()],
            lock_password: true,
        }
    }

    #[test]
    fn test_issue_and_verify_recovers_snapshot() {
        let handler = create_handler("test-secret-key-12345");
        let user = create_test_user();

        let token = handler.issue(&user).unwrap();
        assert_eq!(token.matches('.').count(), 2);

        let claims = handler.verify(&token).unwrap();
        assert_eq!(claims.user.id, 42);
        assert_eq!(claims.user.perm, user.perm);
        assert!(claims.user.lock_password);
        assert_eq!(claims.user.locale, "de");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_token_lifetime_is_two_hours() {
        let handler = create_handler("test-secret-key-12345");
        let now = Utc::now();

        let token = handler.issue_at(&create_test_user(), now).unwrap();
        let claims = handler.verify(&token).unwrap();
        assert_eq!(claims.exp - now.timestamp(), 2 * 3600);
    }

    #[test]
    fn test_token_does_not_carry_password_or_username() {
        let handler = create_handler("test-secret-key-12345");
        let token = handler.issue(&create_test_user()).unwrap();

        let key = handler.settings.signing_key();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        let raw = decode::<serde_json::Value>(&token, &DecodingKey::from_secret(&key), &validation)
            .unwrap()
            .claims;
        assert!(raw["user"].get("password").is_none());
        assert!(raw["user"].get("username").is_none());
        assert!(raw["user"].get("scope").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let handler = create_handler("test-secret-key-12345");
        let issued = Utc::now() - Duration::hours(3);

        let token = handler.issue_at(&create_test_user(), issued).unwrap();
        assert!(matches!(handler.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let handler = create_handler("test-secret-key-12345");

        assert!(matches!(
            handler.verify("invalid.token.here"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(handler.verify(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let handler = create_handler("test-secret-key-12345");
        let token = handler.issue(&create_test_user()).unwrap();

        let other = handler
            .issue(&User {
                id: 1,
                perm: Permissions::administrator(),
                ..create_test_user()
            })
            .unwrap();

        // Graft the admin payload onto the original signature.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(handler.verify(&forged), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = create_handler("secret1");
        let handler2 = create_handler("secret2");

        let token = handler1.issue(&create_test_user()).unwrap();
        assert!(matches!(handler2.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rotated_key_invalidates_old_tokens() {
        let handler = create_handler("before-rotation");
        let token = handler.issue(&create_test_user()).unwrap();

        handler.settings.rotate_key(b"after-rotation".to_vec());
        assert!(matches!(handler.verify(&token), Err(AuthError::InvalidToken)));

        let fresh = handler.issue(&create_test_user()).unwrap();
        assert!(handler.verify(&fresh).is_ok());
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let handler = create_handler("test-secret-key-12345");
        let claims = SessionClaims {
            user: SessionUser::from_user(&create_test_user()),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iss: "someone-else".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-12345"),
        )
        .unwrap();

        assert!(matches!(handler.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let handler = create_handler("test-secret-key-12345");
        let claims = SessionClaims {
            user: SessionUser::from_user(&create_test_user()),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-12345"),
        )
        .unwrap();

        assert!(matches!(handler.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_needs_renewal_threshold() {
        let handler = create_handler("test-secret-key-12345");
        let issued = Utc::now();
        let token = handler.issue_at(&create_test_user(), issued).unwrap();
        let claims = handler.verify(&token).unwrap();

        assert!(!JwtHandler::needs_renewal_at(&claims, issued));
        assert!(!JwtHandler::needs_renewal_at(&claims, issued + Duration::minutes(30)));
        // Exactly one hour left is not yet below the threshold.
        assert!(!JwtHandler::needs_renewal_at(&claims, issued + Duration::minutes(60)));
        assert!(JwtHandler::needs_renewal_at(&claims, issued + Duration::minutes(65)));
        assert!(JwtHandler::needs_renewal_at(&claims, issued + Duration::minutes(119)));
    }

    #[test]
    fn test_fresh_token_needs_no_renewal() {
        let handler = create_handler("test-secret-key-12345");
        let token = handler.issue(&create_test_user()).unwrap();
        let claims = handler.verify(&token).unwrap();
        assert!(!JwtHandler::needs_renewal(&claims));
    }
}
