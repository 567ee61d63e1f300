use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::models::{AuditAction, ClientMeta, Role, Session, Team, User};
use crate::services::audit::AuditRecorder;
use crate::services::database::Database;
use crate::services::error::ServiceError;
use crate::services::jwt::JwtService;
use crate::utils::password::{hash_password, verify_password, Password};
use crate::utils::token::hash_token;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Core identity operations: registration, login, session rotation, logout
/// and role management.
#[derive(Clone)]
pub struct IdentityService {
    db: Database,
    jwt: JwtService,
    audit: AuditRecorder,
}

impl IdentityService {
    pub fn new(db: Database, jwt: JwtService, audit: AuditRecorder) -> Self {
        Self { db, jwt, audit }
    }

    /// Register a new account.
    ///
    /// Without a team the caller founds a fresh team and becomes its admin.
    /// With a team (invitation flow) the account joins as a member; the
    /// invitation's role, if different, is applied by the caller afterwards.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        team_name: Option<&str>,
        existing_team_id: Option<Uuid>,
    ) -> Result<User, ServiceError> {
        if self.db.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(password.to_string()))?;

        let (team_id, role, founded_team) = match existing_team_id {
            Some(team_id) => {
                if self.db.find_team_by_id(team_id).await?.is_none() {
                    return Err(ServiceError::TeamNotFound);
                }
                (Some(team_id), Role::Member, None)
            }
            None => {
                let name = team_name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}'s team", display_name));
                let team = Team::new(name, None);
                self.db.insert_team(&team).await?;
                (Some(team.team_id), Role::Admin, Some(team))
            }
        };

        let user = User::new(
            team_id,
            email.to_string(),
            password_hash.into_string(),
            display_name.to_string(),
            role,
        );
        // The unique index on LOWER(email) backstops the pre-check; a racing
        // duplicate insert comes back as a conflict.
        self.db.insert_user(&user).await?;

        if let Some(team) = &founded_team {
            self.audit.record(
                Some(user.user_id),
                Some(team.team_id),
                AuditAction::TeamCreated,
                Some("team"),
                Some(team.team_id),
                Some(json!({ "team_name": team.team_name })),
            );
        }
        self.audit.record(
            Some(user.user_id),
            user.team_id,
            AuditAction::UserRegistered,
            Some("user"),
            Some(user.user_id),
            Some(json!({ "email": user.email, "role": user.role_code })),
        );

        Ok(user)
    }

    /// Authenticate with email and password and open a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> Result<(User, IssuedTokens), ServiceError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let stored = crate::utils::password::PasswordHashString::new(user.password_hash.clone());
        verify_password(&Password::new(password.to_string()), &stored)
            .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.is_active() {
            return Err(ServiceError::AccountDisabled);
        }

        let tokens = self.issue_session(&user, meta).await?;
        self.db.update_last_login(user.user_id).await?;

        self.audit.record(
            Some(user.user_id),
            user.team_id,
            AuditAction::UserLogin,
            Some("user"),
            Some(user.user_id),
            None,
        );

        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new pair, rotating the stored session.
    ///
    /// A token that was already rotated (replay), an expired session, or an
    /// inactive user all come back as the same invalid-token error.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, ServiceError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| ServiceError::InvalidToken)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidToken)?;

        let user = self
            .db
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;
        if !user.is_active() {
            return Err(ServiceError::InvalidToken);
        }

        let (access_token, new_refresh_token) = self.jwt.generate_token_pair(&user)?;
        let old_hash = hash_token(refresh_token);
        let new_hash = hash_token(&new_refresh_token);
        let new_expiry = Utc::now() + Duration::days(self.jwt.refresh_token_expiry_days());

        let rotated = self
            .db
            .rotate_session(&old_hash, &new_hash, new_expiry)
            .await?;
        if rotated.is_none() {
            return Err(ServiceError::InvalidToken);
        }

        self.audit.record(
            Some(user.user_id),
            user.team_id,
            AuditAction::TokenRefreshed,
            Some("session"),
            rotated.map(|s| s.session_id),
            None,
        );

        Ok(IssuedTokens {
            access_token,
            refresh_token: new_refresh_token,
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Close the session behind a refresh token. Idempotent: logging out an
    /// unknown or already-rotated token succeeds without effect.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let hash = hash_token(refresh_token);
        let deleted = self.db.delete_session_by_hash(&hash).await?;

        if deleted > 0 {
            if let Ok(claims) = self.jwt.validate_refresh_token(refresh_token) {
                if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
                    let team_id = self
                        .db
                        .find_user_by_id(user_id)
                        .await
                        .ok()
                        .flatten()
                        .and_then(|u| u.team_id);
                    self.audit.record(
                        Some(user_id),
                        team_id,
                        AuditAction::UserLogout,
                        Some("session"),
                        None,
                        None,
                    );
                }
            }
        }

        Ok(())
    }

    /// Look up a user by id.
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.db
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// List the members of a team.
    pub async fn list_team_members(&self, team_id: Uuid) -> Result<Vec<User>, ServiceError> {
        Ok(self.db.find_users_by_team(team_id).await?)
    }

    /// Change a team member's role. The target must belong to the acting
    /// principal's team; a target outside it reads as not found.
    pub async fn update_role(
        &self,
        acting_user_id: Uuid,
        acting_team_id: Uuid,
        target_user_id: Uuid,
        new_role: Role,
    ) -> Result<User, ServiceError> {
        let target = self
            .db
            .find_user_by_id(target_user_id)
            .await?
            .filter(|u| u.team_id == Some(acting_team_id))
            .ok_or(ServiceError::UserNotFound)?;

        let old_role = target.role_code.clone();
        self.db
            .update_user_role(target_user_id, new_role.as_str())
            .await?;

        self.audit.record(
            Some(acting_user_id),
            Some(acting_team_id),
            AuditAction::RoleChanged,
            Some("user"),
            Some(target_user_id),
            Some(json!({ "from": old_role, "to": new_role.as_str() })),
        );

        self.get_user(target_user_id).await
    }

    /// Issue a token pair and persist the session row.
    pub async fn issue_session(
        &self,
        user: &User,
        meta: ClientMeta,
    ) -> Result<IssuedTokens, ServiceError> {
        let (access_token, refresh_token) = self.jwt.generate_token_pair(user)?;
        let session = Session::new(
            user.user_id,
            hash_token(&refresh_token),
            self.jwt.refresh_token_expiry_days(),
            meta,
        );
        self.db.insert_session(&session).await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Delete expired session rows. Returns the number removed.
    pub async fn sweep_expired_sessions(&self) -> Result<u64, ServiceError> {
        Ok(self.db.delete_expired_sessions().await?)
    }
}
