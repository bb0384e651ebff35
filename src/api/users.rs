//! Account endpoints.
//!
//! Record access is self-or-admin, except list and create which are admin
//! only. Field-level rules for updates live in the store.

use crate::api::{decode_body, run_blocking, AppState};
use crate::auth::errors::{AuthError, Result};
use crate::auth::middleware::Authenticated;
use crate::auth::models::{FieldSelection, Identifier, ModifyUserRequest, User};
use crate::auth::permissions::check_record_access;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{debug, warn};

/// Only a numeric id addresses a record in a route path.
fn parse_user_id(raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|_| {
        debug!(raw, "Rejected non-numeric user id");
        AuthError::InvalidIdentifierType
    })
}

fn require_admin(auth: &Authenticated) -> Result<()> {
    if auth.user().is_admin() {
        Ok(())
    } else {
        warn!(caller = auth.id(), "Admin-only endpoint refused");
        Err(AuthError::Forbidden)
    }
}

fn require_self_or_admin(auth: &Authenticated, target_id: u64) -> Result<()> {
    if check_record_access(auth.user(), target_id).is_allowed() {
        Ok(())
    } else {
        warn!(caller = auth.id(), target = target_id, "Record access refused");
        Err(AuthError::Forbidden)
    }
}

/// List all users - GET /api/users (Admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<Vec<User>>> {
    require_admin(&auth)?;
    Ok(Json(state.users.list()?))
}

/// Get one user - GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let id = parse_user_id(&id)?;
    require_self_or_admin(&auth, id)?;

    let user = state.users.resolve(&Identifier::Id(id))?;
    Ok(Json(user.cleaned()))
}

/// Create user - POST /api/users (Admin only)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    payload: std::result::Result<Json<ModifyUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    require_admin(&auth)?;

    let request = decode_body(payload)?;
    request.check_kind()?;

    let users = state.users.clone();
    let created = run_blocking(move || users.create(request.data)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update user - PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ModifyUserRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let id = parse_user_id(&id)?;
    require_self_or_admin(&auth, id)?;

    let request = decode_body(payload)?;
    request.check_kind()?;
    if request.data.id != id {
        return Err(AuthError::malformed("body id does not match path id"));
    }
    let selection = FieldSelection::parse(request.which.as_slice())?;

    let users = state.users.clone();
    let caller = auth.user().clone();
    run_blocking(move || users.update(&caller, request.data, selection)).await?;
    Ok(StatusCode::OK)
}

/// Delete user - DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_user_id(&id)?;
    require_self_or_admin(&auth, id)?;

    state.users.delete(&Identifier::Id(id))?;
    Ok(StatusCode::OK)
}
