//! Caller authentication and authorization.
//!
//! Callers do not talk to the worker directly: their role travels inside
//! the job descriptor as a sealed credential token. The vault opens the
//! token, and the gate decides whether that role may run the requested
//! operation.

pub mod gate;
pub mod vault;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gate::{AuthorizationGate, PermissionMatrix};
pub use vault::{CredentialVault, VaultError, VaultKey, KEY_LENGTH};

/// Role of the caller that submitted a job.
///
/// Unrecognized role names are kept verbatim in [`Role::Other`] so the gate
/// can deny them instead of rejecting the credentials outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Librarian,
    #[default]
    Member,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Member => "member",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "admin" => Role::Admin,
            "librarian" => Role::Librarian,
            "member" => Role::Member,
            _ => Role::Other(name),
        }
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::from(name.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decrypted credential record.
///
/// Exists only while a single job is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Caller role; `member` when absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,
}

impl Credentials {
    /// Credentials carrying an explicit role.
    pub fn new(role: Role) -> Self {
        Self {
            user_type: Some(role),
        }
    }

    /// Effective role.
    pub fn role(&self) -> Role {
        self.user_type.clone().unwrap_or_default()
    }
}
