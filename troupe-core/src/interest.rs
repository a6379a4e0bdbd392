use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use troupe_shared::pii::Masked;
use uuid::Uuid;

use crate::dates::{BudgetRange, DateRange};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestStatus {
    Open,
    Matched,
    Converted,
    Cancelled,
}

impl InterestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestStatus::Open => "OPEN",
            InterestStatus::Matched => "MATCHED",
            InterestStatus::Converted => "CONVERTED",
            InterestStatus::Cancelled => "CANCELLED",
        }
    }
}

/// A traveler's request to join a trip to a destination within a date and
/// budget window. Never deleted, only status-transitioned.
///
/// Invariant: `group_id` is set iff `status` is MATCHED or CONVERTED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
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
    /// Client-generated idempotency token; resubmission with the same value
    /// must not create a second Interest.
    pub client_uuid: String,
    pub status: InterestStatus,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Interest {
    pub fn travel_window(&self) -> DateRange {
        DateRange::new(self.date_from, self.date_to)
    }

    pub fn budget_window(&self) -> BudgetRange {
        BudgetRange::new(self.budget_min, self.budget_max)
    }

    pub fn is_open(&self) -> bool {
        self.status == InterestStatus::Open
    }
}

/// Payload of the public "express interest" action.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInterest {
    pub destination_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub num_people: i32,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub special_requests: Option<String>,
    pub client_uuid: String,
}

impl NewInterest {
    /// Ingestion-time validation. A request that fails here never enters the
    /// matching pool.
    pub fn validate(&self) -> CoreResult<()> {
        if self.user_name.trim().is_empty() {
            return Err(CoreError::Validation("user_name must not be empty".into()));
        }
        if self.user_email.trim().is_empty() || !self.user_email.contains('@') {
            return Err(CoreError::Validation(
                "user_email must be a plausible email address".into(),
            ));
        }
        if self.num_people < 1 {
            return Err(CoreError::Validation(
                "num_people must be at least 1".into(),
            ));
        }
        let window = DateRange::new(self.date_from, self.date_to);
        if !window.is_valid() {
            return Err(CoreError::Validation(
                "date_from must not be after date_to".into(),
            ));
        }
        let budget = BudgetRange::new(self.budget_min, self.budget_max);
        if !budget.is_valid() {
            return Err(CoreError::Validation(
                "budget range must be non-negative and ordered".into(),
            ));
        }
        if self.client_uuid.trim().is_empty() {
            return Err(CoreError::Validation(
                "client_uuid must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Materialize a stored Interest in OPEN status.
    pub fn into_interest(self) -> Interest {
        let now = Utc::now();
        Interest {
            id: Uuid::new_v4(),
            destination_id: self.destination_id,
            user_name: self.user_name,
            user_email: Masked(self.user_email),
            user_phone: self.user_phone.map(Masked),
            num_people: self.num_people,
            date_from: self.date_from,
            date_to: self.date_to,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            special_requests: self.special_requests,
            client_uuid: self.client_uuid,
            status: InterestStatus::Open,
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
