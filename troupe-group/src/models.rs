use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use troupe_catalog::PriceBreakdown;
use troupe_core::interest::Interest;
use troupe_shared::pii::Masked;
use uuid::Uuid;

/// Decline reason recorded when a member never answered inside the window.
pub const EXPIRED_REASON: &str = "expired";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    Forming,
    Confirmed,
    Full,
    Cancelled,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Forming => "FORMING",
            GroupStatus::Confirmed => "CONFIRMED",
            GroupStatus::Full => "FULL",
            GroupStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GroupStatus::Full | GroupStatus::Cancelled)
    }
}

/// A priced, sized cohort formed from compatible interests.
///
/// `current_size` is always the count of confirmations with
/// `confirmed == Some(true)`; it is recomputed inside the per-group critical
/// section after every confirmation transition. `version` is the optimistic
/// concurrency token checked by `GroupRepository::update_group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub name: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub min_size: i32,
    pub max_size: i32,
    pub current_size: i32,
    /// Sum of member party sizes at formation; what the trip was priced for.
    pub seat_count: i32,
    pub base_price: f64,
    pub final_price_per_person: f64,
    pub pricing: PriceBreakdown,
    pub status: GroupStatus,
    pub admin_notes: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status a group should hold after a confirmation tally, given where it is
/// now. Terminal states never move; FULL beats CANCELLED when the last
/// pending member resolves a group that already hit capacity.
pub fn derive_status(
    current: GroupStatus,
    confirmed_count: i32,
    min_size: i32,
    max_size: i32,
    all_resolved: bool,
) -> GroupStatus {
    if current.is_terminal() {
        return current;
    }
    if confirmed_count >= max_size {
        return GroupStatus::Full;
    }
    if all_resolved && confirmed_count < min_size {
        return GroupStatus::Cancelled;
    }
    if confirmed_count >= min_size {
        return GroupStatus::Confirmed;
    }
    current
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// One member's pending/confirmed/declined response for a group, plus their
/// payment state. Owned by the group; created when the group is formed.
///
/// Invariant: once `confirmed` is non-None it never changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub interest_id: Uuid,
    pub member_name: String,
    pub member_email: Masked<String>,
    /// Opaque token mailed to the member; the only credential needed to
    /// answer the invitation.
    pub token: String,
    pub confirmed: Option<bool>,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub decline_reason: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Confirmation {
    pub fn new(group_id: Uuid, interest: &Interest, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            group_id,
            interest_id: interest.id,
            member_name: interest.user_name.clone(),
            member_email: interest.user_email.clone(),
            token: Uuid::new_v4().simple().to_string(),
            confirmed: None,
            payment_status: PaymentStatus::Pending,
            expires_at,
            decline_reason: None,
            dispatched_at: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.confirmed.is_some()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed == Some(true)
    }

    /// Pending and past its deadline at `now`. Safe to evaluate repeatedly.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.confirmed.is_none() && now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forming_until_min_size_is_reached() {
        let s = derive_status(GroupStatus::Forming, 2, 4, 20, false);
        assert_eq!(s, GroupStatus::Forming);
    }

    #[test]
    fn min_size_promotes_to_confirmed() {
        let s = derive_status(GroupStatus::Forming, 4, 4, 20, false);
        assert_eq!(s, GroupStatus::Confirmed);
    }

    #[test]
    fn max_size_promotes_to_full() {
        let s = derive_status(GroupStatus::Confirmed, 20, 4, 20, false);
        assert_eq!(s, GroupStatus::Full);
    }

    #[test]
    fn all_resolved_below_min_cancels() {
        let s = derive_status(GroupStatus::Forming, 3, 4, 20, true);
        assert_eq!(s, GroupStatus::Cancelled);
    }

    #[test]
    fn all_resolved_above_min_stays_confirmed() {
        let s = derive_status(GroupStatus::Confirmed, 5, 4, 20, true);
        assert_eq!(s, GroupStatus::Confirmed);
    }

    #[test]
    fn terminal_states_never_move() {
        let s = derive_status(GroupStatus::Cancelled, 20, 4, 20, true);
        assert_eq!(s, GroupStatus::Cancelled);
        let s = derive_status(GroupStatus::Full, 0, 4, 20, true);
        assert_eq!(s, GroupStatus::Full);
    }
}
