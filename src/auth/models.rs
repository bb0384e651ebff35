//! Authentication Models
//! Mission: Define account records, session claims and the identifiers used to address them

use crate::auth::errors::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability flags. Only `admin` gates anything in the account core; the
/// rest are carried for the file-serving layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub admin: bool,
    pub execute: bool,
    pub create: bool,
    pub rename: bool,
    pub modify: bool,
    pub delete: bool,
    pub share: bool,
    pub download: bool,
}

impl Permissions {
    /// Every capability, as granted to the bootstrap administrator.
    pub fn administrator() -> Self {
        Self {
            admin: true,
            execute: true,
            create: true,
            rename: true,
            modify: true,
            delete: true,
            share: true,
            download: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Mosaic,
}

/// User account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Plaintext when it arrives in a request body, bcrypt hash once stored.
    #[serde(skip_serializing)]
    pub password: String,
    pub scope: String,
    pub locale: String,
    pub view_mode: ViewMode,
    pub perm: Permissions,
    pub commands: Vec<String>,
    pub lock_password: bool,
}

impl User {
    /// Drop the password hash before the record leaves the store.
    pub fn clean(&mut self) {
        self.password.clear();
    }

    pub fn cleaned(mut self) -> Self {
        self.clean();
        self
    }

    /// Copy the listed fields of `source` onto `self`, leaving the rest alone.
    pub fn copy_fields_from(&mut self, source: &User, fields: &[UserField]) {
        for field in fields {
            match field {
                UserField::Username => self.username = source.username.clone(),
                UserField::Password => self.password = source.password.clone(),
                UserField::Scope => self.scope = source.scope.clone(),
                UserField::Locale => self.locale = source.locale.clone(),
                UserField::ViewMode => self.view_mode = source.view_mode,
                UserField::Perm => self.perm = source.perm.clone(),
                UserField::Commands => self.commands = source.commands.clone(),
                UserField::LockPassword => self.lock_password = source.lock_password,
            }
        }
    }
}

/// Snapshot of the public account fields embedded in a session token.
///
/// This is taken at issuance and is not refreshed until the client renews,
/// so permission changes lag by up to one token lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: u64,
    pub locale: String,
    pub view_mode: ViewMode,
    pub perm: Permissions,
    pub commands: Vec<String>,
    pub lock_password: bool,
}

impl SessionUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            locale: user.locale.clone(),
            view_mode: user.view_mode,
            perm: user.perm.clone(),
            commands: user.commands.clone(),
            lock_password: user.lock_password,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.perm.admin
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    pub exp: i64, // expiration timestamp (seconds)
    pub iss: String,
}

/// Either lookup key accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Id(u64),
    Username(String),
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(username: &str) -> Self {
        Identifier::Username(username.to_string())
    }
}

impl From<String> for Identifier {
    fn from(username: String) -> Self {
        Identifier::Username(username)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "#{}", id),
            Identifier::Username(name) => write!(f, "{}", name),
        }
    }
}

/// Fields a partial update may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Username,
    Password,
    Scope,
    Locale,
    ViewMode,
    Perm,
    Commands,
    LockPassword,
}

/// Sentinel accepted as the sole `which` entry to replace a whole record.
pub const ALL_FIELDS: &str = "all";

impl UserField {
    pub const ALL: [UserField; 8] = [
        UserField::Username,
        UserField::Password,
        UserField::Scope,
        UserField::Locale,
        UserField::ViewMode,
        UserField::Perm,
        UserField::Commands,
        UserField::LockPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Username => "username",
            UserField::Password => "password",
            UserField::Scope => "scope",
            UserField::Locale => "locale",
            UserField::ViewMode => "viewMode",
            UserField::Perm => "perm",
            UserField::Commands => "commands",
            UserField::LockPassword => "lockPassword",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Fields only an administrator may write.
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserField::Username | UserField::Scope | UserField::Perm)
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a partial update intends to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Whole-record replacement, administrators only.
    All,
    Fields(Vec<UserField>),
}

impl FieldSelection {
    /// Parse the `which` list of an update request.
    pub fn parse<S: AsRef<str>>(which: &[S]) -> Result<Self> {
        match which {
            [] => Err(AuthError::malformed("`which` must name at least one field")),
            [only] if only.as_ref() == ALL_FIELDS => Ok(FieldSelection::All),
            _ => which
                .iter()
                .map(|name| {
                    let name = name.as_ref();
                    UserField::from_name(name)
                        .ok_or_else(|| AuthError::malformed(format!("unknown field `{}`", name)))
                })
                .collect::<Result<Vec<_>>>()
                .map(FieldSelection::Fields),
        }
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Signup request body
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of user create/update requests: `{ what?, which, data }`.
#[derive(Debug, Deserialize)]
pub struct ModifyUserRequest {
    #[serde(default)]
    pub what: Option<String>,
    #[serde(default)]
    pub which: Vec<String>,
    pub data: User,
}

impl ModifyUserRequest {
    /// The optional `what` tag must name a user when present.
    pub fn check_kind(&self) -> Result<()> {
        match self.what.as_deref() {
            None | Some("user") => Ok(()),
            Some(other) => Err(AuthError::malformed(format!(
                "expected a user payload, got `{}`",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            password: "$2b$04$hash".to_string(),
            scope: "/srv/alice".to_string(),
            locale: "en".to_string(),
            view_mode: ViewMode::Mosaic,
            perm: Permissions::default(),
            commands: vec!["git".to_string()],
            lock_password: true,
        }
    }

    #[test]
    fn test_user_serialization_omits_password() {
        let json = serde_json::to_value(create_test_user()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["viewMode"], "mosaic");
        assert_eq!(json["lockPassword"], true);
    }

    #[test]
    fn test_user_deserialization_accepts_password() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "username": "bob",
            "password": "secret",
            "perm": { "admin": true }
        }))
        .unwrap();
        assert_eq!(user.password, "secret");
        assert!(user.perm.admin);
        assert!(!user.perm.download);
        assert_eq!(user.view_mode, ViewMode::List);
    }

    #[test]
    fn test_copy_fields_leaves_unlisted_untouched() {
        let mut stored = create_test_user();
        let incoming = User {
            id: 7,
            username: "mallory".to_string(),
            locale: "fr".to_string(),
            ..User::default()
        };

        stored.copy_fields_from(&incoming, &[UserField::Locale]);
        assert_eq!(stored.locale, "fr");
        assert_eq!(stored.username, "alice");
        assert_eq!(stored.scope, "/srv/alice");
        assert!(!stored.password.is_empty());
    }

    #[test]
    fn test_session_user_snapshot() {
        let user = create_test_user();
        let snapshot = SessionUser::from_user(&user);
        assert_eq!(snapshot.id, 7);
        assert!(snapshot.lock_password);
        assert!(!snapshot.is_admin());
        assert_eq!(snapshot.commands, vec!["git".to_string()]);
    }

    #[test]
    fn test_identifier_conversions() {
        assert_eq!(Identifier::from(12), Identifier::Id(12));
        assert_eq!(
            Identifier::from("alice"),
            Identifier::Username("alice".to_string())
        );
        assert_eq!(Identifier::Id(7).to_string(), "#7");
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in UserField::ALL {
            assert_eq!(UserField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(UserField::from_name("Password"), None);
        assert_eq!(UserField::from_name("all"), None);
    }

    #[test]
    fn test_field_selection_parse() {
        assert_eq!(FieldSelection::parse(&["all"]).unwrap(), FieldSelection::All);
        assert_eq!(
            FieldSelection::parse(&["locale", "viewMode"]).unwrap(),
            FieldSelection::Fields(vec![UserField::Locale, UserField::ViewMode])
        );

        let empty: [&str; 0] = [];
        assert!(matches!(
            FieldSelection::parse(&empty),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            FieldSelection::parse(&["all", "locale"]),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            FieldSelection::parse(&["Scope"]),
            Err(AuthError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_modify_request_kind() {
        let req: ModifyUserRequest = serde_json::from_value(json!({
            "what": "share",
            "which": ["locale"],
            "data": { "id": 1 }
        }))
        .unwrap();
        assert!(req.check_kind().is_err());

        let req: ModifyUserRequest =
            serde_json::from_value(json!({ "which": ["locale"], "data": { "id": 1 } })).unwrap();
        assert!(req.check_kind().is_ok());
    }
}
