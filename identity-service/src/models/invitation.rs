//! Invitation model - single-use team-join tokens with pre-assigned roles.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Role;

/// Invitation state codes. Expiry is detected lazily on redemption, so a
/// pending row past its expiry is treated as expired without a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Accepted,
}

impl InvitationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationState::Pending => "pending",
            InvitationState::Accepted => "accepted",
        }
    }
}

/// Invitation entity.
#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub invitation_id: Uuid,
    pub team_id: Uuid,
    pub email: String,
    pub role_code: String,
    pub token_hash: String,
    pub state_code: String,
    pub expiry_utc: DateTime<Utc>,
    pub accepted_utc: Option<DateTime<Utc>>,
    pub invited_by_user_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Invitation {
    /// Create a new pending invitation.
    pub fn new(
        team_id: Uuid,
        email: String,
        role: Role,
        token_hash: String,
        expiry_days: i64,
        invited_by_user_id: Uuid,
    ) -> Self {
        Self {
            invitation_id: Uuid::new_v4(),
            team_id,
            email,
            role_code: role.as_str().to_string(),
            token_hash,
            state_code: InvitationState::Pending.as_str().to_string(),
            expiry_utc: Utc::now() + Duration::days(expiry_days),
            accepted_utc: None,
            invited_by_user_id,
            created_utc: Utc::now(),
        }
    }

    /// Check if invitation is pending and not expired.
    pub fn is_valid(&self) -> bool {
        self.state_code == InvitationState::Pending.as_str() && Utc::now() < self.expiry_utc
    }

    /// Parse the stored role code.
    pub fn role(&self) -> Option<Role> {
        Role::from_code(&self.role_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_invitation() -> Invitation {
        Invitation::new(
            Uuid::new_v4(),
            "bob@example.com".to_string(),
            Role::Member,
            "hash".to_string(),
            7,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn fresh_invitation_is_valid() {
        assert!(pending_invitation().is_valid());
    }

    #[test]
    fn expired_invitation_is_invalid_even_when_pending() {
        let mut invitation = pending_invitation();
        invitation.expiry_utc = Utc::now() - Duration::seconds(1);
        assert_eq!(invitation.state_code, "pending");
        assert!(invitation.accepted_utc.is_none());
        assert!(!invitation.is_valid());
    }

    #[test]
    fn accepted_invitation_is_invalid() {
        let mut invitation = pending_invitation();
        invitation.state_code = InvitationState::Accepted.as_str().to_string();
        invitation.accepted_utc = Some(Utc::now());
        assert!(!invitation.is_valid());
    }
}
