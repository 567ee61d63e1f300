use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::Role;
use crate::AppState;

/// Authenticated caller, attached to the request by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
}

/// Require a valid bearer token and attach the caller as a [`Principal`].
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing authorization token")))?;

    let principal = principal_from_token(&state, &token)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Reject callers whose role is not in the allow list. Must run after
/// [`authenticate`].
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing authorization token")))?;

    if !allowed.contains(&principal.role) {
        return Err(AppError::Forbidden(anyhow::anyhow!("Insufficient role")));
    }

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn principal_from_token(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired token")))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired token")))?;

    Ok(Principal {
        user_id,
        email: claims.email,
        role: claims.role,
        team_id: claims.team_id,
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing authorization token")))
    }
}
