use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use troupe_core::context::RequestContext;
use troupe_group::models::GroupStatus;
use uuid::Uuid;

use crate::error::AppError;
use crate::groups::GroupResponse;
use crate::state::AppState;

fn operator_ctx(headers: &HeaderMap) -> RequestContext {
    let operator = headers
        .get("x-operator-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("ops");
    RequestContext::operator(operator)
}

#[derive(Debug, Deserialize)]
pub struct FormGroupRequest {
    pub destination_id: Uuid,
    pub interest_ids: Vec<Uuid>,
}

/// POST /v1/admin/groups
/// Manual formation: an operator picks the members explicitly. The selection
/// still has to pass the same compatibility rules as a batch run.
pub async fn form_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FormGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    if req.interest_ids.is_empty() {
        return Err(AppError::BadRequest("interest_ids must not be empty".into()));
    }
    let ctx = operator_ctx(&headers);
    let group = state
        .clusterer
        .form_from_interests(&ctx, req.destination_id, &req.interest_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub status: Option<GroupStatus>,
    pub admin_notes: Option<String>,
}

/// POST /v1/admin/groups/{id}/status
/// Operator override. Cancelling is the only status an operator may force;
/// everything else is derived from member responses.
pub async fn override_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    let ctx = operator_ctx(&headers);
    let group = match (req.status, req.admin_notes) {
        (Some(GroupStatus::Cancelled), notes) => {
            state.workflow.cancel_group(&ctx, group_id, notes).await?
        }
        (Some(other), _) => {
            return Err(AppError::BadRequest(format!(
                "cannot force group status {}",
                other.as_str()
            )))
        }
        (None, Some(notes)) => state.workflow.set_admin_notes(&ctx, group_id, notes).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "nothing to change: provide status or admin_notes".into(),
            ))
        }
    };
    Ok(Json(group.into()))
}
