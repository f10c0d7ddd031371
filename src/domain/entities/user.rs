//! User entity, connection principal, and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// User role matching the database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a user account in the chat system.
///
/// Maps to the `users` table:
/// - username: VARCHAR(32) PRIMARY KEY
/// - display_name: VARCHAR(64) NULL
/// - color: VARCHAR(16) NOT NULL DEFAULT '#7a9cc6'
/// - role: VARCHAR(16) NOT NULL DEFAULT 'user'
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique username (primary key)
    pub username: String,

    /// Display name (optional, falls back to username)
    pub display_name: Option<String>,

    /// Chat color tag shown next to messages
    pub color: String,

    /// User role
    pub role: Role,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Get the user's display name, falling back to username if not set.
    pub fn display_name_or_username(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Derive the connection principal for this user.
    pub fn principal(&self) -> Principal {
        Principal {
            username: self.username.clone(),
            display_name: self.display_name_or_username().to_string(),
            color: self.color.clone(),
            role: self.role,
        }
    }
}

/// Resolved identity of a connection.
///
/// Derived once at connection-authentication time and cached for the
/// connection's lifetime. Immutable per connection: a rename requires
/// re-issuing the principal through a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub display_name: String,
    pub color: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Repository trait for user lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_conversion() {
        assert_eq!(Role::from_str("admin"), Role::Admin);
        assert_eq!(Role::from_str("ADMIN"), Role::Admin);
        assert_eq!(Role::from_str("moderator"), Role::User);
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    #[test]
    fn principal_falls_back_to_username() {
        let user = User {
            username: "alice".into(),
            display_name: None,
            color: "#fff".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        assert_eq!(user.principal().display_name, "alice");
    }
}
