use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use troupe_catalog::PriceBreakdown;
use troupe_core::context::RequestContext;
use troupe_group::models::{Confirmation, Group, GroupStatus, PaymentStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub name: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub min_size: i32,
    pub max_size: i32,
    pub current_size: i32,
    pub seat_count: i32,
    pub base_price: f64,
    pub final_price_per_person: f64,
    pub pricing: PriceBreakdown,
    pub status: GroupStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupResponse {
    fn from(g: Group) -> Self {
        Self {
            id: g.id,
            destination_id: g.destination_id,
            name: g.name,
            date_from: g.date_from,
            date_to: g.date_to,
            min_size: g.min_size,
            max_size: g.max_size,
            current_size: g.current_size,
            seat_count: g.seat_count,
            base_price: g.base_price,
            final_price_per_person: g.final_price_per_person,
            pricing: g.pricing,
            status: g.status,
            admin_notes: g.admin_notes,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

/// Member state as shown to operators. Response tokens are deliberately not
/// included here; they only travel through the dispatch payload.
#[derive(Debug, Serialize)]
pub struct ConfirmationSummary {
    pub id: Uuid,
    pub member_name: String,
    pub member_email: troupe_shared::pii::Masked<String>,
    pub response: &'static str,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub decline_reason: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

fn response_label(c: &Confirmation) -> &'static str {
    match c.confirmed {
        None => "PENDING",
        Some(true) => "CONFIRMED",
        Some(false) => "DECLINED",
    }
}

impl From<Confirmation> for ConfirmationSummary {
    fn from(c: Confirmation) -> Self {
        let response = response_label(&c);
        Self {
            id: c.id,
            member_name: c.member_name,
            member_email: c.member_email,
            response,
            payment_status: c.payment_status,
            expires_at: c.expires_at,
            decline_reason: c.decline_reason,
            responded_at: c.responded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: GroupResponse,
    pub confirmations: Vec<ConfirmationSummary>,
}

#[derive(Debug, Deserialize)]
pub struct GroupFilter {
    pub destination_id: Option<Uuid>,
    pub status: Option<GroupStatus>,
}

/// What a member sees when they open their confirmation link.
#[derive(Debug, Serialize)]
pub struct ConfirmationViewResponse {
    pub group: GroupResponse,
    pub confirmation_id: Uuid,
    pub response: &'static str,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub confirmed: bool,
    pub decline_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub confirmation_id: Uuid,
    pub group_status: GroupStatus,
    pub current_size: i32,
    pub payment_required: bool,
    pub payment_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispatchMember {
    pub confirmation_id: Uuid,
    pub member_name: String,
    pub member_email: troupe_shared::pii::Masked<String>,
    pub confirm_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub group_id: Uuid,
    pub dispatched: usize,
    pub members: Vec<DispatchMember>,
}

#[derive(Debug, Serialize)]
pub struct PaidResponse {
    pub confirmation_id: Uuid,
    pub payment_status: PaymentStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/groups
pub async fn list_groups(
    State(state): State<AppState>,
    Query(filter): Query<GroupFilter>,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    let groups = state
        .groups
        .list_groups(filter.destination_id, filter.status)
        .await?;
    Ok(Json(groups.into_iter().map(Into::into).collect()))
}

/// GET /v1/groups/{id}
/// Operator view: the group plus every member's confirmation state.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetailResponse>, AppError> {
    let group = state
        .groups
        .get_group(group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group not found: {}", group_id)))?;
    let confirmations = state.groups.confirmations_for(group_id).await?;
    Ok(Json(GroupDetailResponse {
        group: group.into(),
        confirmations: confirmations.into_iter().map(Into::into).collect(),
    }))
}

/// GET /v1/groups/{id}/confirm/{token}
pub async fn confirmation_view(
    State(state): State<AppState>,
    Path((group_id, token)): Path<(Uuid, String)>,
) -> Result<Json<ConfirmationViewResponse>, AppError> {
    let (group, confirmation) = state.workflow.confirmation_view(group_id, &token).await?;
    let response = response_label(&confirmation);
    Ok(Json(ConfirmationViewResponse {
        group: group.into(),
        confirmation_id: confirmation.id,
        response,
        payment_status: confirmation.payment_status,
        expires_at: confirmation.expires_at,
    }))
}

/// POST /v1/groups/{id}/confirm/{token}
/// Apply a member's confirm or decline.
pub async fn respond(
    State(state): State<AppState>,
    Path((group_id, token)): Path<(Uuid, String)>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, AppError> {
    let ctx = RequestContext::traveler(format!("token:{}", &token[..token.len().min(8)]));
    let outcome = state
        .workflow
        .respond(&ctx, group_id, &token, req.confirmed, req.decline_reason)
        .await?;

    let payment_url = outcome.payment_required.then(|| {
        format!(
            "{}/confirmations/{}",
            state.business_rules.payment_base_url, outcome.confirmation.id
        )
    });
    Ok(Json(RespondResponse {
        confirmation_id: outcome.confirmation.id,
        group_status: outcome.group.status,
        current_size: outcome.group.current_size,
        payment_required: outcome.payment_required,
        payment_url,
    }))
}

/// POST /v1/groups/{id}/send-confirmations
/// Hand the notification collaborator everything it needs to reach the
/// pending members: token, deadline, and the confirm link.
pub async fn send_confirmations(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DispatchResponse>, AppError> {
    let ctx = RequestContext::system();
    let entries = state.workflow.dispatch_confirmations(&ctx, group_id).await?;
    let members: Vec<DispatchMember> = entries
        .into_iter()
        .map(|e| DispatchMember {
            confirmation_id: e.confirmation_id,
            member_name: e.member_name,
            member_email: e.member_email,
            confirm_url: format!(
                "{}/v1/groups/{}/confirm/{}",
                state.business_rules.api_base_url, group_id, e.token
            ),
            expires_at: e.expires_at,
        })
        .collect();
    Ok(Json(DispatchResponse {
        group_id,
        dispatched: members.len(),
        members,
    }))
}

/// POST /v1/confirmations/{id}/paid
/// Payment collaborator callback.
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(confirmation_id): Path<Uuid>,
) -> Result<Json<PaidResponse>, AppError> {
    let ctx = RequestContext::system();
    let confirmation = state.workflow.mark_paid(&ctx, confirmation_id).await?;
    Ok(Json(PaidResponse {
        confirmation_id: confirmation.id,
        payment_status: confirmation.payment_status,
    }))
}

/// GET /v1/groups/{id}/stream
/// SSE feed of one group's domain events, for collaborators that would
/// otherwise poll.
pub async fn group_events(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.group_id() == Some(group_id) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().event("group_event").data(data)))
            }
            _ => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
