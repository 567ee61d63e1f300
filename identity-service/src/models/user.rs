//! User model - team-scoped user accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User roles, in increasing order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role code. Returns None for unknown codes.
    pub fn from_code(code: &str) -> Option<Role> {
        match code {
            "member" => Some(Role::Member),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role_code: String,
    pub active_flag: bool,
    pub email_verified: bool,
    pub last_login_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(
        team_id: Option<Uuid>,
        email: String,
        password_hash: String,
        display_name: String,
        role: Role,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            team_id,
            email,
            password_hash,
            display_name,
            role_code: role.as_str().to_string(),
            active_flag: true,
            email_verified: false,
            last_login_utc: None,
            created_utc: Utc::now(),
        }
    }

    /// Check if the account is active.
    pub fn is_active(&self) -> bool {
        self.active_flag
    }

    /// Parse the stored role code.
    pub fn role(&self) -> Option<Role> {
        Role::from_code(&self.role_code)
    }

    /// Convert to sanitized response (no password hash).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
    pub last_login_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            team_id: u.team_id,
            email: u.email,
            display_name: u.display_name,
            role: u.role_code,
            active: u.active_flag,
            email_verified: u.email_verified,
            last_login_utc: u.last_login_utc,
            created_utc: u.created_utc,
        }
    }
}
