//! Process configuration from command-line flags and environment.

use crate::settings::{Settings, UserDefaults};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Clone)]
#[command(name = "filedesk")]
#[command(about = "Account and session service for a multi-user file manager")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "FILEDESK_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// HMAC secret for session tokens (random per process when unset)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Allow anonymous signup
    #[arg(long, env = "FILEDESK_SIGNUP", default_value_t = false)]
    pub signup: bool,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Username of the administrator created on an empty store
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Password for that administrator (generated and logged once when unset)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Scope given to accounts created through signup
    #[arg(long, env = "FILEDESK_DEFAULT_SCOPE", default_value = ".")]
    pub default_scope: String,

    /// Locale given to accounts created through signup
    #[arg(long, env = "FILEDESK_DEFAULT_LOCALE", default_value = "en")]
    pub default_locale: String,
}

impl Config {
    /// The configured secret, unless it is missing or blank.
    fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// False when the signing key will be generated, so sessions end on restart.
    pub fn has_jwt_secret(&self) -> bool {
        self.secret().is_some()
    }

    /// Signing key from the configured secret, or a fresh random one.
    pub fn signing_key(&self) -> Vec<u8> {
        match self.secret() {
            Some(secret) => secret.as_bytes().to_vec(),
            None => Settings::generate_key(),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            key: self.signing_key(),
            signup: self.signup,
            defaults: UserDefaults {
                scope: self.default_scope.clone(),
                locale: self.default_locale.clone(),
                ..UserDefaults::default()
            },
        }
    }
}
