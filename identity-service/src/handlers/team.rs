use axum::{
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    AcceptInviteRequest, AuthResponse, InviteRequest, InviteResponse, TeamMembersResponse,
    TokenResponse, UpdateRoleRequest,
};
use crate::handlers::auth::client_meta;
use crate::middleware::Principal;
use crate::AppState;

/// POST /api/team/invite (admin or manager)
pub async fn invite(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<InviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let team_id = principal
        .team_id
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Caller has no team")))?;

    let (invitation, token) = state
        .invitations
        .invite(team_id, principal.user_id, &payload.email, payload.role)
        .await
        .map_err(AppError::from)?;

    tracing::info!(
        invitation_id = %invitation.invitation_id,
        team_id = %team_id,
        "Invitation created"
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            invitation_id: invitation.invitation_id,
            email: invitation.email,
            role: invitation.role_code,
            token,
            expires_utc: invitation.expiry_utc,
        }),
    ))
}

/// POST /api/team/accept-invite (public)
pub async fn accept_invite(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let meta = client_meta(&request);
    let Json(payload) = Json::<AcceptInviteRequest>::from_request(request, &())
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e)))?;
    payload.validate()?;

    let (user, tokens) = state
        .invitations
        .accept(&payload.token, &payload.password, &payload.display_name, meta)
        .await
        .map_err(AppError::from)?;

    tracing::info!(user_id = %user.user_id, "Invitation accepted");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.sanitized(),
            tokens: TokenResponse::from(tokens),
        }),
    ))
}

/// GET /api/team/members
pub async fn members(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let team_id = principal
        .team_id
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Caller has no team")))?;

    let members = state
        .identity
        .list_team_members(team_id)
        .await
        .map_err(AppError::from)?;

    Ok(Json(TeamMembersResponse {
        members: members.iter().map(|u| u.sanitized()).collect(),
    }))
}

/// PUT /api/team/member/role (admin)
pub async fn update_role(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let team_id = principal
        .team_id
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Caller has no team")))?;

    let user = state
        .identity
        .update_role(principal.user_id, team_id, payload.user_id, payload.role)
        .await
        .map_err(AppError::from)?;

    tracing::info!(
        target_user_id = %payload.user_id,
        new_role = payload.role.as_str(),
        "Role updated"
    );

    Ok(Json(user.sanitized()))
}
