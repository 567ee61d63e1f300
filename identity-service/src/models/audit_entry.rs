//! Audit entry model - append-only record of security-relevant actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audit action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserLogin,
    UserLogout,
    TokenRefreshed,
    RoleChanged,
    TeamCreated,
    InvitationCreated,
    InvitationAccepted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user_registered",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserLogout => "user_logout",
            AuditAction::TokenRefreshed => "token_refreshed",
            AuditAction::RoleChanged => "role_changed",
            AuditAction::TeamCreated => "team_created",
            AuditAction::InvitationCreated => "invitation_created",
            AuditAction::InvitationAccepted => "invitation_accepted",
        }
    }
}

/// Audit entry entity. Immutable once written.
#[derive(Debug, Clone, FromRow)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub action_code: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a new audit entry.
    pub fn new(
        user_id: Option<Uuid>,
        team_id: Option<Uuid>,
        action: AuditAction,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            user_id,
            team_id,
            action_code: action.as_str().to_string(),
            entity_type: entity_type.map(str::to_string),
            entity_id,
            metadata,
            created_utc: Utc::now(),
        }
    }
}

/// Audit entry response for API.
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub entry_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            entry_id: e.entry_id,
            user_id: e.user_id,
            team_id: e.team_id,
            action: e.action_code,
            entity_type: e.entity_type,
            entity_id: e.entity_id,
            metadata: e.metadata,
            created_utc: e.created_utc,
        }
    }
}
