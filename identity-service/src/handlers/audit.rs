use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{AuditListQuery, AuditListResponse};
use crate::middleware::Principal;
use crate::models::AuditEntryResponse;
use crate::services::AuditFilter;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;

/// GET /api/audit-logs (admin)
///
/// Team-scoped audit trail, newest first.
pub async fn list(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AuditListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = principal
        .team_id
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Caller has no team")))?;

    let filter = AuditFilter {
        user_id: query.user_id,
        action: query.action,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let (entries, total) = state.db.find_audit_entries(team_id, &filter).await?;

    Ok(Json(AuditListResponse {
        entries: entries.into_iter().map(AuditEntryResponse::from).collect(),
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}
