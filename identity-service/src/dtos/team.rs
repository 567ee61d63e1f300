use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AuditEntryResponse, Role, UserResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role granted when the invitation is accepted.
    #[serde(default = "default_invite_role")]
    pub role: Role,
}

fn default_invite_role() -> Role {
    Role::Member
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub invitation_id: Uuid,
    pub email: String,
    pub role: String,
    /// The raw invitation token. Shown once; only its hash is stored.
    pub token: String,
    pub expires_utc: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1, message = "Invitation token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Display name is required"))]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct TeamMembersResponse {
    pub members: Vec<UserResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<AuditEntryResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_request_defaults_to_member() {
        let req: InviteRequest = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(req.role, Role::Member);
    }

    #[test]
    fn test_invite_request_accepts_explicit_role() {
        let req: InviteRequest =
            serde_json::from_str(r#"{"email":"a@b.com","role":"manager"}"#).unwrap();
        assert_eq!(req.role, Role::Manager);
    }

    #[test]
    fn test_invite_request_rejects_unknown_role() {
        let req: Result<InviteRequest, _> =
            serde_json::from_str(r#"{"email":"a@b.com","role":"owner"}"#);
        assert!(req.is_err());
    }
}
