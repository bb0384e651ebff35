//! User Storage
//! Mission: Own the account collection and gate every mutation through the permission guard

use crate::auth::errors::{AuthError, Result};
use crate::auth::models::{FieldSelection, Identifier, Permissions, SessionUser, User, UserField};
use crate::auth::password::PasswordHasher;
use crate::auth::permissions::{authorize_fields, check_record_access};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Plaintext behind the hash that unknown-user logins are checked against.
const DUMMY_PASSWORD: &str = "filedesk-no-such-user";

/// Persistence collaborator behind [`UserStore`].
///
/// Lookups return `AuthError::NotExist` when nothing matches. Implementations
/// provide their own concurrency safety.
pub trait UserBackend: Send + Sync {
    fn get_by_id(&self, id: u64) -> Result<User>;

    fn get_by_username(&self, username: &str) -> Result<User>;

    fn all(&self) -> Result<Vec<User>>;

    /// Persist a new user and return the id assigned to it.
    fn insert(&self, user: &User) -> Result<u64>;

    /// Write the listed fields of `user` onto the stored record with the same
    /// id. An empty list replaces the whole record.
    fn update(&self, user: &User, fields: &[UserField]) -> Result<()>;

    fn delete_by_id(&self, id: u64) -> Result<()>;

    fn delete_by_username(&self, username: &str) -> Result<()>;
}

/// Account store with pluggable persistence and hashing.
pub struct UserStore {
    backend: Arc<dyn UserBackend>,
    hasher: Arc<dyn PasswordHasher>,
    /// Hash of `DUMMY_PASSWORD` at the hasher's cost, made on first use.
    dummy_hash: OnceLock<String>,
}

impl UserStore {
    pub fn new(backend: Arc<dyn UserBackend>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            backend,
            hasher,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Look up a user by id or username. The returned record still holds its
    /// password hash; clean it before sending it anywhere.
    pub fn resolve(&self, identifier: &Identifier) -> Result<User> {
        match identifier {
            Identifier::Id(0) => Err(AuthError::NotExist),
            Identifier::Id(id) => self.backend.get_by_id(*id),
            Identifier::Username(username) => self.backend.get_by_username(username),
        }
    }

    /// All users, hashes cleared, ascending by id whatever order the backend
    /// returns them in.
    pub fn list(&self) -> Result<Vec<User>> {
        let mut users = self.backend.all()?;
        for user in &mut users {
            user.clean();
        }
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.backend.all()?.is_empty())
    }

    /// Create a user from a plaintext password. Returns the stored record,
    /// cleaned, with its assigned id.
    pub fn create(&self, mut user: User) -> Result<User> {
        if user.username.is_empty() {
            return Err(AuthError::malformed("username must not be empty"));
        }
        if user.password.is_empty() {
            return Err(AuthError::malformed("password must not be empty"));
        }

        match self.backend.get_by_username(&user.username) {
            Ok(_) => return Err(AuthError::AlreadyExists),
            Err(AuthError::NotExist) => {}
            Err(e) => return Err(e),
        }

        user.password = self.hasher.hash(&user.password)?;
        user.id = 0;
        user.id = self.backend.insert(&user)?;

        info!(user_id = user.id, username = %user.username, "✅ Created user");

        Ok(user.cleaned())
    }

    /// Check a username/password pair. Unknown user and wrong password are
    /// indistinguishable to the caller.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user = match self.backend.get_by_username(username) {
            Ok(user) => user,
            Err(AuthError::NotExist) => {
                // Same bcrypt cost as a wrong password
                self.verify_against_dummy(password);
                warn!(username, "❌ Login for unknown user");
                return Err(AuthError::Forbidden);
            }
            Err(e) => return Err(e),
        };

        if !self.hasher.verify(password, &user.password)? {
            warn!(username, "❌ Failed login attempt");
            return Err(AuthError::Forbidden);
        }

        Ok(user)
    }

    /// Partial update on behalf of `caller`.
    ///
    /// Only the selected fields are validated and written. Every field is
    /// authorized before the first write, so a denied field leaves the
    /// stored record untouched.
    pub fn update(&self, caller: &SessionUser, mut user: User, selection: FieldSelection) -> Result<()> {
        if !check_record_access(caller, user.id).is_allowed() {
            warn!(caller = caller.id, target = user.id, "Record access denied");
            return Err(AuthError::Forbidden);
        }

        let fields = match selection {
            FieldSelection::All => {
                if !caller.is_admin() {
                    warn!(caller = caller.id, target = user.id, "Full replace denied");
                    return Err(AuthError::Forbidden);
                }
                if user.username.is_empty() {
                    return Err(AuthError::malformed("username must not be empty"));
                }

                if user.password.is_empty() {
                    user.password = self.resolve(&Identifier::Id(user.id))?.password;
                } else {
                    user.password = self.hasher.hash(&user.password)?;
                }

                Vec::new()
            }
            FieldSelection::Fields(fields) => {
                authorize_fields(caller, user.id, &fields)?;
                validate_fields(&user, &fields)?;

                if fields.contains(&UserField::Password) {
                    user.password = self.hasher.hash(&user.password)?;
                }

                fields
            }
        };

        self.backend.update(&user, &fields)?;

        info!(caller = caller.id, target = user.id, fields = ?fields, "User updated");
        Ok(())
    }

    fn verify_against_dummy(&self, password: &str) {
        let hash = match self.dummy_hash.get() {
            Some(hash) => hash,
            None => match self.hasher.hash(DUMMY_PASSWORD) {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(e) => {
                    error!("Failed to prepare dummy password hash: {:#}", e);
                    return;
                }
            },
        };
        let _ = self.hasher.verify(password, hash);
    }

    pub fn delete(&self, identifier: &Identifier) -> Result<()> {
        match identifier {
            Identifier::Id(0) => return Err(AuthError::NotExist),
            Identifier::Id(id) => self.backend.delete_by_id(*id)?,
            Identifier::Username(username) => self.backend.delete_by_username(username)?,
        }

        info!(user = %identifier, "🗑️  Deleted user");
        Ok(())
    }

    /// Create the first administrator when the store is empty. Returns
    /// whether an account was created.
    pub fn bootstrap_admin(&self, username: &str, password: &str) -> Result<bool> {
        if !self.is_empty()? {
            return Ok(false);
        }

        self.create(User {
            username: username.to_string(),
            password: password.to_string(),
            scope: ".".to_string(),
            locale: "en".to_string(),
            perm: Permissions::administrator(),
            ..User::default()
        })?;

        info!(username, "🔐 Bootstrap administrator created");
        Ok(true)
    }
}

fn validate_fields(user: &User, fields: &[UserField]) -> Result<()> {
    for field in fields {
        match field {
            UserField::Username if user.username.is_empty() => {
                return Err(AuthError::malformed("username must not be empty"));
            }
            UserField::Password if user.password.is_empty() => {
                return Err(AuthError::malformed("password must not be empty"));
            }
            _ => {}
        }
    }
    Ok(())
}
