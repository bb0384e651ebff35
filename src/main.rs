//! Filedesk - account and session service
//! Mission: Authenticate file-manager users and guard every change to their accounts

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filedesk_backend::{
    api::{self, AppState},
    auth::{BcryptHasher, MemoryBackend, UserStore},
    config::Config,
    settings::SharedSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    let _ = dotenv();
    init_tracing();

    let config = Config::parse();

    info!("🚀 Filedesk starting");
    if !config.has_jwt_secret() {
        warn!("⚠️  JWT_SECRET unset or blank: using a random key, sessions end on restart");
    }

    let settings = SharedSettings::new(config.settings());
    let user_store = Arc::new(UserStore::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(BcryptHasher::new(config.bcrypt_cost)),
    ));

    bootstrap_admin(&user_store, &config)?;

    let state = AppState::new(user_store, settings);
    let app = api::router(state).layer(CorsLayer::permissive());

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("🎯 API server listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Create the first administrator on an empty store
fn bootstrap_admin(store: &UserStore, config: &Config) -> Result<()> {
    let (password, generated) = match config.admin_password.clone() {
        Some(password) if !password.is_empty() => (password, false),
        _ => (
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect::<String>(),
            true,
        ),
    };

    let created = store
        .bootstrap_admin(&config.admin_username, &password)
        .context("Failed to create bootstrap administrator")?;

    if created && generated {
        warn!(
            "⚠️  Generated administrator password for '{}': {} (set ADMIN_PASSWORD to choose one)",
            config.admin_username, password
        );
    }

    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedesk_backend=debug,filedesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
