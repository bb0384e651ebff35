//! Shared Runtime Settings
//! Mission: Hold the signing key and new-account defaults behind a reader/writer lock
//!
//! Settings are loaded once at startup and handed around as a cheap clone of
//! [`SharedSettings`]. Readers (every token issue/verify) never block each
//! other; the rare writer (key rotation, signup toggle) blocks them briefly.

use crate::auth::models::{Permissions, User, ViewMode};
use parking_lot::{RwLock, RwLockReadGuard}; // Faster than std RwLock for short critical sections
use rand::RngCore;
use std::sync::Arc;
use tracing::info;

/// Length in bytes of a generated signing key.
pub const KEY_LEN: usize = 64;

/// Values applied to accounts created through signup.
#[derive(Debug, Clone)]
pub struct UserDefaults {
    pub scope: String,
    pub locale: String,
    pub view_mode: ViewMode,
    pub perm: Permissions,
    pub commands: Vec<String>,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            scope: ".".to_string(),
            locale: "en".to_string(),
            view_mode: ViewMode::List,
            perm: Permissions {
                create: true,
                rename: true,
                modify: true,
                delete: true,
                share: true,
                download: true,
                ..Permissions::default()
            },
            commands: Vec::new(),
        }
    }
}

impl UserDefaults {
    pub fn apply(&self, user: &mut User) {
        user.scope = self.scope.clone();
        user.locale = self.locale.clone();
        user.view_mode = self.view_mode;
        user.perm = self.perm.clone();
        user.commands = self.commands.clone();
    }
}

#[derive(Clone)]
pub struct Settings {
    /// HMAC key for session tokens.
    pub key: Vec<u8>,
    /// Whether anonymous signup is open.
    pub signup: bool,
    pub defaults: UserDefaults,
}

impl Settings {
    pub fn new(key: Vec<u8>) -> Self {
        Self {
            key,
            signup: false,
            defaults: UserDefaults::default(),
        }
    }

    /// Fresh random key. Tokens signed with it do not survive a restart.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("key", &"<redacted>")
            .field("signup", &self.signup)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Process-wide settings handle.
#[derive(Clone, Debug)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Shared read guard. Do not hold it across an `.await` or a bcrypt call.
    pub fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.inner.read()
    }

    pub fn signing_key(&self) -> Vec<u8> {
        self.inner.read().key.clone()
    }

    /// Swap the signing key. Every token signed with the old key stops verifying.
    pub fn rotate_key(&self, key: Vec<u8>) {
        self.inner.write().key = key;
        info!("🔑 Session signing key rotated");
    }

    pub fn set_signup(&self, enabled: bool) {
        self.inner.write().signup = enabled;
        info!(enabled, "Signup setting changed");
    }
}
