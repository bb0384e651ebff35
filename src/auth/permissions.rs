//! Permission Guard
//! Mission: Decide, per record and per field, what a caller may touch
//!
//! Decisions are made on the caller's session snapshot, not the live record.

use crate::auth::errors::{AuthError, Result};
use crate::auth::models::{SessionUser, UserField};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Self-or-admin.
pub fn check_record_access(caller: &SessionUser, target_id: u64) -> Decision {
    Decision::from_bool(caller.id == target_id || caller.is_admin())
}

/// Whether `caller` may write `field` on the record `target_id`.
pub fn check_field_write(caller: &SessionUser, target_id: u64, field: UserField) -> Decision {
    if !check_record_access(caller, target_id).is_allowed() {
        return Decision::Deny;
    }
    if caller.is_admin() {
        return Decision::Allow;
    }

    match field {
        UserField::Password => Decision::from_bool(!caller.lock_password),
        f if f.is_privileged() => Decision::Deny,
        _ => Decision::Allow,
    }
}

/// Decide every field first; a single denial rejects the whole set before
/// anything is written.
pub fn authorize_fields(caller: &SessionUser, target_id: u64, fields: &[UserField]) -> Result<()> {
    let denied: Vec<UserField> = fields
        .iter()
        .copied()
        .filter(|f| !check_field_write(caller, target_id, *f).is_allowed())
        .collect();

    if denied.is_empty() {
        return Ok(());
    }

    warn!(
        caller = caller.id,
        target = target_id,
        denied = ?denied,
        "Field update denied"
    );
    Err(AuthError::Forbidden)
}
