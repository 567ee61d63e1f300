use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{Role, User};

const REFRESH_TOKEN_TYPE: &str = "refresh";

/// JWT service for token generation and validation.
///
/// Tokens are signed with HMAC-SHA256 over a server-held secret. After a
/// secret rotation the previous secret stays accepted for verification
/// (but never for signing) so outstanding tokens expire naturally instead
/// of all sessions dying at once.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_keys: Vec<DecodingKey>,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived, full identity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Role at issue time
    pub role: Role,
    /// Team the user belongs to
    pub team_id: Option<Uuid>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Claims for refresh tokens (long-lived, user id + type marker only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Type marker so an access token can never pass as a refresh token
    pub token_type: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut decoding_keys = vec![DecodingKey::from_secret(config.secret.as_bytes())];
        if let Some(prev) = &config.previous_secret {
            decoding_keys.push(DecodingKey::from_secret(prev.as_bytes()));
        }

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_keys,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        team_id: Option<Uuid>,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            team_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Generate a refresh token for a user.
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))
    }

    /// Generate both access and refresh tokens for a user.
    pub fn generate_token_pair(&self, user: &User) -> Result<(String, String), anyhow::Error> {
        let role = user
            .role()
            .ok_or_else(|| anyhow::anyhow!("Unknown role code: {}", user.role_code))?;
        let access_token =
            self.generate_access_token(user.user_id, &user.email, role, user.team_id)?;
        let refresh_token = self.generate_refresh_token(user.user_id)?;
        Ok((access_token, refresh_token))
    }

    /// Validate and decode an access token.
    ///
    /// Malformed tokens, bad signatures and expired tokens all collapse to
    /// the same opaque error so callers cannot distinguish which check
    /// failed.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        self.decode_with_any_key::<AccessTokenClaims>(token)
            .map_err(|_| anyhow::anyhow!("Invalid access token"))
    }

    /// Validate and decode a refresh token. Same opaque-failure contract as
    /// access tokens; a missing or wrong type marker is also just invalid.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, anyhow::Error> {
        let claims = self
            .decode_with_any_key::<RefreshTokenClaims>(token)
            .map_err(|_| anyhow::anyhow!("Invalid refresh token"))?;

        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(anyhow::anyhow!("Invalid refresh token"));
        }

        Ok(claims)
    }

    fn decode_with_any_key<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<T, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let mut last_err = None;
        for key in &self.decoding_keys {
            match decode::<T>(token, key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken)
        }))
    }

    /// Get access token expiry in seconds (for client info).
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    /// Get refresh token expiry in days (for session rows).
    pub fn refresh_token_expiry_days(&self) -> i64 {
        self.refresh_token_expiry_days
    }
}
