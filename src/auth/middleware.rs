//! Authentication Middleware
//! Mission: Protect API endpoints with session token validation

use crate::auth::errors::{AuthError, Result};
use crate::auth::jwt::JwtHandler;
use crate::auth::models::{SessionClaims, SessionUser};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

/// Response header set when the presented token is close to expiry.
pub const RENEW_HEADER: &str = "x-renew-token";

/// Query parameter checked when the Authorization header has no usable token.
pub const AUTH_QUERY_PARAM: &str = "auth";

/// Identity attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub claims: SessionClaims,
    pub renewal_advised: bool,
}

impl Authenticated {
    pub fn id(&self) -> u64 {
        self.claims.user.id
    }

    pub fn user(&self) -> &SessionUser {
        &self.claims.user
    }
}

/// Pull a candidate token out of the request.
///
/// The Authorization header wins when it holds something shaped like a
/// signed token (exactly two dots); anything else there, such as a basic
/// credential from an older client, falls through to `?auth=`.
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Result<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(strip_bearer)
        .filter(|t| !t.is_empty() && t.matches('.').count() == 2);

    if let Some(token) = from_header {
        return Ok(token.to_string());
    }

    uri.query()
        .and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == AUTH_QUERY_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::NoToken)
}

fn strip_bearer(value: &str) -> &str {
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
        _ => value.trim(),
    }
}

/// Extract and verify. Every failure comes back as `Forbidden` so callers
/// cannot tell a missing token from a bad or stale one.
pub fn authenticate(jwt: &JwtHandler, headers: &HeaderMap, uri: &Uri) -> Result<Authenticated> {
    let token = extract_token(headers, uri).map_err(|e| reject(uri, e))?;
    let claims = jwt.verify(&token).map_err(|e| reject(uri, e))?;

    let renewal_advised = JwtHandler::needs_renewal(&claims);

    Ok(Authenticated {
        claims,
        renewal_advised,
    })
}

/// Collapse any failure to `Forbidden`. Ordinary token problems are routine
/// and stay at debug; anything else is logged loudly.
fn reject(uri: &Uri, err: AuthError) -> AuthError {
    if err.is_authentication_failure() {
        debug!(path = uri.path(), reason = %err, "Request rejected");
    } else {
        error!(path = uri.path(), "Authentication failed unexpectedly: {:#}", err);
    }
    AuthError::Forbidden
}

/// Auth middleware that validates session tokens
pub async fn auth_middleware(
    State(jwt_handler): State<JwtHandler>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = authenticate(&jwt_handler, req.headers(), req.uri())?;
    let renewal_advised = auth.renewal_advised;

    // Handlers read the caller from request extensions
    req.extensions_mut().insert(auth);

    let mut response = next.run(req).await;
    if renewal_advised {
        response.headers_mut().insert(
            HeaderName::from_static(RENEW_HEADER),
            HeaderValue::from_static("true"),
        );
    }

    Ok(response)
}
