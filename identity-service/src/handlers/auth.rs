use axum::{
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    AuthResponse, LoginRequest, LogoutRequest, MeResponse, RefreshRequest, RegisterRequest,
    TokenResponse,
};
use crate::middleware::Principal;
use crate::models::ClientMeta;
use crate::AppState;

/// Pull client metadata out of the proxy headers. Absent headers are fine;
/// the session row just stores nulls.
pub fn client_meta(request: &Request) -> ClientMeta {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    ClientMeta {
        ip: header("x-forwarded-for").map(|v| v.split(',').next().unwrap_or("").trim().to_string()),
        user_agent: header("user-agent"),
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let meta = client_meta(&request);
    let payload: RegisterRequest = json_body(request).await?;
    payload.validate()?;

    let user = state
        .identity
        .register(
            &payload.email,
            &payload.password,
            &payload.display_name,
            payload.team_name.as_deref(),
            None,
        )
        .await
        .map_err(AppError::from)?;

    let tokens = state
        .identity
        .issue_session(&user, meta)
        .await
        .map_err(AppError::from)?;

    tracing::info!(user_id = %user.user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.sanitized(),
            tokens: TokenResponse::from(tokens),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let meta = client_meta(&request);
    let payload: LoginRequest = json_body(request).await?;
    payload.validate()?;

    let (user, tokens) = state
        .identity
        .login(&payload.email, &payload.password, meta)
        .await
        .map_err(AppError::from)?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.sanitized(),
        tokens: TokenResponse::from(tokens),
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tokens = state
        .identity
        .refresh(&payload.refresh_token)
        .await
        .map_err(AppError::from)?;

    Ok(Json(TokenResponse::from(tokens)))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    state
        .identity
        .logout(&payload.refresh_token)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "message": "Logged out" })))
}

/// GET /api/auth/verify
///
/// Cheap token check for other services: decodes the bearer token without a
/// database round trip and echoes the claims. Absent or invalid tokens are
/// rejected by the authentication layer with a 401.
pub async fn verify(principal: Principal) -> impl IntoResponse {
    Json(json!({
        "user_id": principal.user_id,
        "email": principal.email,
        "role": principal.role.as_str(),
        "team_id": principal.team_id,
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .identity
        .get_user(principal.user_id)
        .await
        .map_err(AppError::from)?;

    let team = match user.team_id {
        Some(team_id) => state.db.find_team_by_id(team_id).await?.map(Into::into),
        None => None,
    };

    Ok(Json(MeResponse {
        user: user.sanitized(),
        team,
    }))
}

async fn json_body<T: serde::de::DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let Json(payload) = Json::<T>::from_request(request, &())
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e)))?;
    Ok(payload)
}
