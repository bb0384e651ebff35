//! HTTP surface: login, signup, renew and account CRUD.

pub mod error;
pub mod session;
pub mod users;

use crate::auth::{auth_middleware, JwtHandler, UserStore};
use crate::middleware::request_logging;
use crate::settings::SharedSettings;
use axum::{
    extract::rejection::JsonRejection,
    middleware,
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use std::sync::Arc;

use crate::auth::errors::{AuthError, Result};

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub jwt: JwtHandler,
    pub settings: SharedSettings,
}

impl AppState {
    pub fn new(users: Arc<UserStore>, settings: SharedSettings) -> Self {
        Self {
            users,
            jwt: JwtHandler::new(settings.clone()),
            settings,
        }
    }
}

/// Build the full router. Everything except health, login and signup sits
/// behind the token check.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/renew", post(session::renew))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(session::login))
        .route("/api/signup", post(session::signup))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Run a store call that may hash or verify a password on the blocking pool,
/// off the async workers.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("Password task panicked")?
}

/// Body decoding happens before anything touches the store.
pub(crate) fn decode_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthError::malformed(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_passes_result_through() {
        assert_eq!(run_blocking(|| Ok(7)).await.unwrap(), 7);

        let denied: Result<()> = run_blocking(|| Err(AuthError::Forbidden)).await;
        assert!(matches!(denied, Err(AuthError::Forbidden)));
    }

    #[tokio::test]
    async fn test_run_blocking_panic_is_internal() {
        let result: Result<()> = run_blocking(|| -> Result<()> { panic!("hasher blew up") }).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }
}
