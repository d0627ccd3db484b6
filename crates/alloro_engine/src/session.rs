//! Session context handed to the API client at construction.
//!
//! Token, role and account are read once by the caller (config file or CLI
//! flags) and travel with the client; nothing here reads ambient storage.

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" | "super_admin" => Some(Role::Admin),
            "user" | "viewer" | "manager" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContext {
    pub token: Option<String>,
    pub role: Option<Role>,
    pub account_id: Option<String>,
}

impl SessionContext {
    pub fn new(token: Option<String>, role: Option<Role>, account_id: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            role,
            account_id: account_id.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Refuses admin-only calls when the role is known and is not admin.
    /// An unknown role is left for the server to decide.
    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        match self.role {
            Some(Role::User) => Err(ApiError::new(
                FailureKind::Forbidden,
                "admin role required",
            )),
            Some(Role::Admin) | None => Ok(()),
        }
    }
}
