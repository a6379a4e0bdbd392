use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use troupe_catalog::CatalogError;
use troupe_core::context::RequestContext;
use troupe_core::events::EventSink;
use troupe_core::interest::{Interest, InterestStatus, NewInterest};
use troupe_shared::models::events::{DomainEvent, InterestReceivedEvent};
use troupe_shared::pii::Masked;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct InterestResponse {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub user_name: String,
    pub user_email: Masked<String>,
    pub user_phone: Option<Masked<String>>,
    pub num_people: i32,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub special_requests: Option<String>,
    pub status: InterestStatus,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Interest> for InterestResponse {
    fn from(i: Interest) -> Self {
        Self {
            id: i.id,
            destination_id: i.destination_id,
            user_name: i.user_name,
            user_email: i.user_email,
            user_phone: i.user_phone,
            num_people: i.num_people,
            date_from: i.date_from,
            date_to: i.date_to,
            budget_min: i.budget_min,
            budget_max: i.budget_max,
            special_requests: i.special_requests,
            status: i.status,
            group_id: i.group_id,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InterestFilter {
    pub destination_id: Option<Uuid>,
    pub status: Option<InterestStatus>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/interests
/// Public "express interest" action. Idempotent on `client_uuid`: a
/// resubmission returns the stored interest instead of creating a duplicate.
pub async fn create_interest(
    State(state): State<AppState>,
    Json(req): Json<NewInterest>,
) -> Result<(StatusCode, Json<InterestResponse>), AppError> {
    req.validate()?;

    let destination = state
        .destinations
        .get(req.destination_id)
        .await?
        .ok_or(CatalogError::NotFound(req.destination_id))?;
    if !destination.is_active {
        return Err(CatalogError::Inactive(destination.id).into());
    }

    let ctx = RequestContext::traveler(req.user_email.clone());
    let interest = req.into_interest();
    let (stored, created) = state.interests.create(interest).await?;

    if created {
        state
            .events
            .emit(DomainEvent::InterestReceived(InterestReceivedEvent {
                interest_id: stored.id,
                destination_id: stored.destination_id,
                num_people: stored.num_people,
                timestamp: Utc::now().timestamp(),
            }));
        tracing::info!(
            interest_id = %stored.id,
            destination_id = %stored.destination_id,
            request_id = %ctx.request_id,
            "interest registered"
        );
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(stored.into())))
}

/// GET /v1/interests
/// Admin listing view over the interest pool.
pub async fn list_interests(
    State(state): State<AppState>,
    Query(filter): Query<InterestFilter>,
) -> Result<Json<Vec<InterestResponse>>, AppError> {
    let interests = state
        .interests
        .list(filter.destination_id, filter.status)
        .await?;
    Ok(Json(interests.into_iter().map(Into::into).collect()))
}
