use serde_json::json;
use uuid::Uuid;

use crate::models::{AuditAction, ClientMeta, Invitation, Role, User};
use crate::services::audit::AuditRecorder;
use crate::services::database::Database;
use crate::services::error::ServiceError;
use crate::services::identity::{IdentityService, IssuedTokens};
use crate::utils::token::{generate_opaque_token, hash_token};

const INVITATION_EXPIRY_DAYS: i64 = 7;

/// Team invitation flow: create an invite token and redeem it into a new
/// member account.
#[derive(Clone)]
pub struct InvitationService {
    db: Database,
    identity: IdentityService,
    audit: AuditRecorder,
}

impl InvitationService {
    pub fn new(db: Database, identity: IdentityService, audit: AuditRecorder) -> Self {
        Self {
            db,
            identity,
            audit,
        }
    }

    /// Invite an email address into a team.
    ///
    /// Returns the invitation row plus the raw token. Only the SHA-256 of
    /// the token is stored; this is the one moment the plaintext exists
    /// server-side.
    pub async fn invite(
        &self,
        team_id: Uuid,
        invited_by: Uuid,
        email: &str,
        role: Role,
    ) -> Result<(Invitation, String), ServiceError> {
        if self.db.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let token = generate_opaque_token();
        let invitation = Invitation::new(
            team_id,
            email.to_string(),
            role,
            hash_token(&token),
            INVITATION_EXPIRY_DAYS,
            invited_by,
        );
        self.db.insert_invitation(&invitation).await?;

        self.audit.record(
            Some(invited_by),
            Some(team_id),
            AuditAction::InvitationCreated,
            Some("invitation"),
            Some(invitation.invitation_id),
            Some(json!({ "email": email, "role": role.as_str() })),
        );

        Ok((invitation, token))
    }

    /// Redeem an invitation token: claim the invitation, create the account
    /// in the inviting team, and open a session.
    ///
    /// The claim is a conditional update, so a token can be redeemed at most
    /// once no matter how many requests race on it.
    pub async fn accept(
        &self,
        token: &str,
        password: &str,
        display_name: &str,
        meta: ClientMeta,
    ) -> Result<(User, IssuedTokens), ServiceError> {
        let invitation = self
            .db
            .find_invitation_by_token_hash(&hash_token(token))
            .await?
            .ok_or(ServiceError::InvitationInvalidOrExpired)?;

        if !invitation.is_valid() {
            return Err(ServiceError::InvitationInvalidOrExpired);
        }

        let claimed = self.db.claim_invitation(invitation.invitation_id).await?;
        if !claimed {
            return Err(ServiceError::InvitationInvalidOrExpired);
        }

        // If the account cannot be created (the invitee registered on their
        // own in the meantime, or the store hiccups) the claim is rolled
        // back so the token stays redeemable.
        let registered = self
            .identity
            .register(
                &invitation.email,
                password,
                display_name,
                None,
                Some(invitation.team_id),
            )
            .await;
        let user = match registered {
            Ok(user) => user,
            Err(e) => {
                if let Err(release_err) =
                    self.db.release_invitation(invitation.invitation_id).await
                {
                    tracing::error!(
                        invitation_id = %invitation.invitation_id,
                        "Failed to release claimed invitation: {}",
                        release_err
                    );
                }
                return Err(e);
            }
        };

        // Registration into an existing team always starts at member; apply
        // the invited role when it differs.
        let user = match invitation.role() {
            Some(role) if role != Role::Member => {
                self.db.update_user_role(user.user_id, role.as_str()).await?;
                self.identity.get_user(user.user_id).await?
            }
            _ => user,
        };

        let tokens = self.identity.issue_session(&user, meta).await?;

        self.audit.record(
            Some(user.user_id),
            Some(invitation.team_id),
            AuditAction::InvitationAccepted,
            Some("invitation"),
            Some(invitation.invitation_id),
            Some(json!({ "email": invitation.email })),
        );

        Ok((user, tokens))
    }
}
