//! Session endpoints: login, signup and token renewal.
//!
//! Tokens go back as a bare `text/plain` body, not wrapped in JSON.

use crate::api::{decode_body, run_blocking, AppState};
use crate::auth::errors::{AuthError, Result};
use crate::auth::middleware::Authenticated;
use crate::auth::models::{Identifier, LoginRequest, SignupRequest, User};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Extension, Json};
use tracing::info;

/// Login endpoint - POST /api/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<String> {
    let payload = decode_body(payload)?;

    let users = state.users.clone();
    let user =
        run_blocking(move || users.authenticate(&payload.username, &payload.password)).await?;
    let token = state.jwt.issue(&user)?;

    info!(user_id = user.id, username = %user.username, "🔐 Login successful");
    Ok(token)
}

/// Signup endpoint - POST /api/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<StatusCode> {
    // Copy out what we need; the guard must not be held while bcrypt runs.
    let (enabled, defaults) = {
        let settings = state.settings.read();
        (settings.signup, settings.defaults.clone())
    };
    if !enabled {
        return Err(AuthError::Forbidden);
    }

    let payload = decode_body(payload)?;
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AuthError::malformed("username and password are required"));
    }

    let mut user = User {
        username: payload.username,
        password: payload.password,
        ..User::default()
    };
    defaults.apply(&mut user);

    let users = state.users.clone();
    let created = run_blocking(move || users.create(user)).await?;
    info!(user_id = created.id, "Signup completed");

    Ok(StatusCode::OK)
}

/// Renew endpoint - POST /api/renew
///
/// Issues from the stored record, not from the presented claims, so any
/// permission change since the last login takes effect here.
pub async fn renew(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<String> {
    let user = state
        .users
        .resolve(&Identifier::Id(auth.id()))
        .map_err(|e| match e {
            AuthError::NotExist => AuthError::Forbidden,
            other => other,
        })?;

    Ok(state.jwt.issue(&user)?)
}
