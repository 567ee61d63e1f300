use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuditEntry, Invitation, Session, Team, User};

/// Filters for the audit trail listing. All fields are optional; the team
/// scope is applied by the caller.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Database access layer, one method per query.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connectivity check for the health endpoint.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Database ping failed: {}", e)))?;
        Ok(())
    }

    // Users

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, team_id, email, password_hash, display_name,
                               role_code, active_flag, email_verified, last_login_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id)
        .bind(user.team_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.role_code)
        .bind(user.active_flag)
        .bind(user.email_verified)
        .bind(user.last_login_utc)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(anyhow::anyhow!("Email is already registered"))
            } else {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert user: {}", e))
            }
        })?;
        Ok(())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find user by email: {}", e)))
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find user by id: {}", e)))
    }

    pub async fn find_users_by_team(&self, team_id: Uuid) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE team_id = $1 ORDER BY created_utc ASC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list team members: {}", e)))
    }

    pub async fn update_user_role(&self, user_id: Uuid, role_code: &str) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE users SET role_code = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(role_code)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update role: {}", e)))?;
        Ok(result.rows_affected())
    }

    pub async fn update_last_login(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_utc = NOW() WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    // Teams

    pub async fn insert_team(&self, team: &Team) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO teams (team_id, team_name, team_slug, description, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(team.team_id)
        .bind(&team.team_name)
        .bind(&team.team_slug)
        .bind(&team.description)
        .bind(team.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert team: {}", e)))?;
        Ok(())
    }

    pub async fn find_team_by_id(&self, team_id: Uuid) -> Result<Option<Team>, AppError> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE team_id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find team: {}", e)))
    }

    // Sessions

    pub async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, refresh_hash, expiry_utc,
                                  client_ip, user_agent, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(&session.refresh_hash)
        .bind(session.expiry_utc)
        .bind(&session.client_ip)
        .bind(&session.user_agent)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert session: {}", e)))?;
        Ok(())
    }

    /// Rotate a session in place: swap the stored refresh hash and push the
    /// expiry forward, but only if the old hash still names a live session.
    ///
    /// The single conditional UPDATE is what makes replays safe. Two
    /// concurrent rotations of the same token race on the WHERE clause and
    /// exactly one of them matches a row; the loser gets `None`.
    pub async fn rotate_session(
        &self,
        old_refresh_hash: &str,
        new_refresh_hash: &str,
        new_expiry_utc: DateTime<Utc>,
    ) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET refresh_hash = $2, expiry_utc = $3
            WHERE refresh_hash = $1 AND expiry_utc > NOW()
            RETURNING *
            "#,
        )
        .bind(old_refresh_hash)
        .bind(new_refresh_hash)
        .bind(new_expiry_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to rotate session: {}", e)))
    }

    pub async fn delete_session_by_hash(&self, refresh_hash: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_hash = $1")
            .bind(refresh_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete session: {}", e)))?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete expired sessions: {}", e))
            })?;
        Ok(result.rows_affected())
    }

    // Invitations

    pub async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (invitation_id, team_id, email, role_code, token_hash,
                                     state_code, expiry_utc, accepted_utc, invited_by_user_id,
                                     created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(invitation.team_id)
        .bind(&invitation.email)
        .bind(&invitation.role_code)
        .bind(&invitation.token_hash)
        .bind(&invitation.state_code)
        .bind(invitation.expiry_utc)
        .bind(invitation.accepted_utc)
        .bind(invitation.invited_by_user_id)
        .bind(invitation.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert invitation: {}", e)))?;
        Ok(())
    }

    pub async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find invitation: {}", e)))
    }

    /// Claim a pending, unexpired invitation. Returns false when the row was
    /// already claimed, expired, or never existed; at most one concurrent
    /// caller can see true for a given token.
    pub async fn claim_invitation(&self, invitation_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET state_code = 'accepted', accepted_utc = NOW()
            WHERE invitation_id = $1 AND state_code = 'pending' AND expiry_utc > NOW()
            "#,
        )
        .bind(invitation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to claim invitation: {}", e)))?;
        Ok(result.rows_affected() == 1)
    }

    /// Put a claimed invitation back to pending. Used when account creation
    /// fails after the claim so the token stays redeemable.
    pub async fn release_invitation(&self, invitation_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET state_code = 'pending', accepted_utc = NULL
            WHERE invitation_id = $1 AND state_code = 'accepted'
            "#,
        )
        .bind(invitation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to release invitation: {}", e)))?;
        Ok(result.rows_affected() == 1)
    }

    // Audit trail

    pub async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (entry_id, user_id, team_id, action_code,
                                       entity_type, entity_id, metadata, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.user_id)
        .bind(entry.team_id)
        .bind(&entry.action_code)
        .bind(entry.entity_type.as_deref())
        .bind(entry.entity_id)
        .bind(&entry.metadata)
        .bind(entry.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert audit entry: {}", e)))?;
        Ok(())
    }

    /// List audit entries for a team, newest first, with optional actor and
    /// action filters.
    pub async fn find_audit_entries(
        &self,
        team_id: Uuid,
        filter: &AuditFilter,
    ) -> Result<(Vec<AuditEntry>, i64), AppError> {
        let mut conditions = vec!["team_id = $1".to_string()];
        let mut arg_idx = 1;

        if filter.user_id.is_some() {
            arg_idx += 1;
            conditions.push(format!("user_id = ${}", arg_idx));
        }
        if filter.action.is_some() {
            arg_idx += 1;
            conditions.push(format!("action_code = ${}", arg_idx));
        }
        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM audit_entries WHERE {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(team_id);
        if let Some(user_id) = filter.user_id {
            count_query = count_query.bind(user_id);
        }
        if let Some(action) = &filter.action {
            count_query = count_query.bind(action.clone());
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count audit entries: {}", e)))?;

        let data_sql = format!(
            "SELECT * FROM audit_entries WHERE {} ORDER BY created_utc DESC LIMIT ${} OFFSET ${}",
            where_clause,
            arg_idx + 1,
            arg_idx + 2,
        );
        let mut data_query = sqlx::query_as::<_, AuditEntry>(&data_sql).bind(team_id);
        if let Some(user_id) = filter.user_id {
            data_query = data_query.bind(user_id);
        }
        if let Some(action) = &filter.action {
            data_query = data_query.bind(action.clone());
        }
        let entries = data_query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list audit entries: {}", e)))?;

        Ok((entries, total))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
