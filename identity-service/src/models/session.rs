//! Session model - one row per login, refresh hash rotated in place.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Client metadata captured at login.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Session entity.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub refresh_hash: String,
    pub expiry_utc: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Session {
    /// Create a new session.
    pub fn new(user_id: Uuid, refresh_hash: String, expiry_days: i64, meta: ClientMeta) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            refresh_hash,
            expiry_utc: Utc::now() + Duration::days(expiry_days),
            client_ip: meta.ip,
            user_agent: meta.user_agent,
            created_utc: Utc::now(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_expired() {
        let session = Session::new(Uuid::new_v4(), "hash".to_string(), 7, ClientMeta::default());
        assert!(!session.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let mut session =
            Session::new(Uuid::new_v4(), "hash".to_string(), 7, ClientMeta::default());
        session.expiry_utc = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }
}
