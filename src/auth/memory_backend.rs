//! In-memory `UserBackend`.

use crate::auth::errors::{AuthError, Result};
use crate::auth::models::{User, UserField};
use crate::auth::user_store::UserBackend;
use anyhow::anyhow;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Users keyed by id behind one reader/writer lock. Ids come from a counter
/// that only moves forward, so a deleted id is never handed out again.
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    users: HashMap<u64, User>,
    next_id: u64,
}

impl MemoryState {
    fn username_taken(&self, username: &str, except_id: u64) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && u.id != except_id)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                users: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBackend for MemoryBackend {
    fn get_by_id(&self, id: u64) -> Result<User> {
        self.state
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or(AuthError::NotExist)
    }

    fn get_by_username(&self, username: &str) -> Result<User> {
        self.state
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(AuthError::NotExist)
    }

    fn all(&self) -> Result<Vec<User>> {
        Ok(self.state.read().users.values().cloned().collect())
    }

    fn insert(&self, user: &User) -> Result<u64> {
        if user.password.is_empty() {
            return Err(anyhow!("refusing to store user without a password hash").into());
        }

        let mut state = self.state.write();
        if state.username_taken(&user.username, 0) {
            return Err(AuthError::AlreadyExists);
        }

        let id = state.next_id;
        state.next_id += 1;

        let mut stored = user.clone();
        stored.id = id;
        state.users.insert(id, stored);

        Ok(id)
    }

    fn update(&self, user: &User, fields: &[UserField]) -> Result<()> {
        let mut state = self.state.write();

        if (fields.is_empty() || fields.contains(&UserField::Username))
            && state.username_taken(&user.username, user.id)
        {
            return Err(AuthError::AlreadyExists);
        }

        let stored = state.users.get_mut(&user.id).ok_or(AuthError::NotExist)?;

        let updated = if fields.is_empty() {
            user.clone()
        } else {
            let mut merged = stored.clone();
            merged.copy_fields_from(user, fields);
            merged
        };
        if updated.password.is_empty() {
            return Err(anyhow!("refusing to clear password hash of user {}", user.id).into());
        }

        *stored = updated;
        Ok(())
    }

    fn delete_by_id(&self, id: u64) -> Result<()> {
        self.state
            .write()
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(AuthError::NotExist)
    }

    fn delete_by_username(&self, username: &str) -> Result<()> {
        let mut state = self.state.write();
        let id = state
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .ok_or(AuthError::NotExist)?;
        state.users.remove(&id);
        Ok(())
    }
}
