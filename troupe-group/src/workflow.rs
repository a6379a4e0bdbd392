use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use troupe_core::context::RequestContext;
use troupe_core::events::EventSink;
use troupe_core::interest::InterestStatus;
use troupe_core::repository::{InterestRepository, StoreError};
use troupe_shared::models::events::{
    ConfirmationsDispatchedEvent, DomainEvent, GroupStatusChangedEvent, MemberRespondedEvent,
    PaymentRecordedEvent,
};
use troupe_shared::pii::Masked;
use uuid::Uuid;

use crate::models::{derive_status, Confirmation, Group, GroupStatus, PaymentStatus, EXPIRED_REASON};
use crate::repository::GroupRepository;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Confirmation not found: {0}")]
    ConfirmationNotFound(Uuid),

    #[error("Confirmation token does not match this group")]
    TokenInvalid,

    #[error("The confirmation window for this invitation has closed")]
    TokenExpired,

    #[error("This invitation has already been answered")]
    AlreadyResponded,

    #[error("A reason is required when declining")]
    MissingReason,

    #[error("The group has already reached its maximum size")]
    CapacityExceeded,

    #[error("The group is no longer accepting responses")]
    GroupClosed,

    #[error("Payment can only be recorded for a confirmed member")]
    PaymentNotAllowed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a member's confirm/decline action.
#[derive(Debug)]
pub struct RespondOutcome {
    pub group: Group,
    pub confirmation: Confirmation,
    /// True on confirm: the member now owes the per-person price.
    pub payment_required: bool,
}

/// What the notification collaborator needs to reach one pending member.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEntry {
    pub confirmation_id: Uuid,
    pub member_name: String,
    pub member_email: Masked<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Per-group state machine driving member confirm/decline/payment and
/// deadline expiry.
///
/// Every confirmation transition and the group recompute that follows it run
/// as one unit inside a per-group critical section, so concurrent responses
/// on the same group serialize instead of racing on `current_size`.
pub struct ConfirmationWorkflow {
    groups: Arc<dyn GroupRepository>,
    interests: Arc<dyn InterestRepository>,
    events: Arc<dyn EventSink>,
    locks: std::sync::Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Attempts at the optimistic group update before giving up. Conflicts are
/// only possible from out-of-band mutations; under the per-group lock the
/// first retry already sees a settled version.
const MAX_UPDATE_ATTEMPTS: usize = 3;

impl ConfirmationWorkflow {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        interests: Arc<dyn InterestRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            groups,
            interests,
            events,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Group summary plus the confirmation a response token resolves to.
    /// Read-only: looking at an invitation never mutates it.
    pub async fn confirmation_view(
        &self,
        group_id: Uuid,
        token: &str,
    ) -> Result<(Group, Confirmation), WorkflowError> {
        let group = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?;
        let confirmation = self
            .groups
            .find_by_token(group_id, token)
            .await?
            .ok_or(WorkflowError::TokenInvalid)?;
        Ok((group, confirmation))
    }

    /// Apply a member's confirm or decline.
    pub async fn respond(
        &self,
        ctx: &RequestContext,
        group_id: Uuid,
        token: &str,
        confirmed: bool,
        decline_reason: Option<String>,
    ) -> Result<RespondOutcome, WorkflowError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;

        let group = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?;
        if group.status == GroupStatus::Cancelled {
            return Err(WorkflowError::GroupClosed);
        }

        let mut confirmation = self
            .groups
            .find_by_token(group_id, token)
            .await?
            .ok_or(WorkflowError::TokenInvalid)?;
        if confirmation.is_resolved() {
            return Err(WorkflowError::AlreadyResponded);
        }

        let now = Utc::now();
        if now >= confirmation.expires_at {
            // Lazy expiry: the deadline passed before the sweep got here.
            // Apply the system transition, then report the closed window.
            self.expire_confirmation(&mut confirmation, now).await?;
            self.recompute(group_id).await?;
            return Err(WorkflowError::TokenExpired);
        }

        if confirmed {
            // First max_size confirms win; a late confirm on a full group is
            // rejected even inside its own deadline.
            if group.status == GroupStatus::Full {
                return Err(WorkflowError::CapacityExceeded);
            }
            confirmation.confirmed = Some(true);
            confirmation.payment_status = PaymentStatus::Pending;
        } else {
            let reason = decline_reason
                .filter(|r| !r.trim().is_empty())
                .ok_or(WorkflowError::MissingReason)?;
            confirmation.confirmed = Some(false);
            confirmation.decline_reason = Some(reason);
        }
        confirmation.responded_at = Some(now);
        confirmation.updated_at = now;
        self.groups.update_confirmation(&confirmation).await?;

        if confirmation.confirmed == Some(false) {
            // An explicit decline takes the member out of the pool for good.
            self.interests
                .mark_cancelled(confirmation.interest_id)
                .await?;
        }

        self.events.emit(DomainEvent::MemberResponded(MemberRespondedEvent {
            group_id,
            confirmation_id: confirmation.id,
            confirmed,
            timestamp: now.timestamp(),
        }));
        tracing::info!(
            group_id = %group_id,
            confirmation_id = %confirmation.id,
            confirmed,
            actor = ?ctx.actor,
            "member responded"
        );

        let group = self.recompute(group_id).await?;
        Ok(RespondOutcome {
            group,
            confirmation,
            payment_required: confirmed,
        })
    }

    /// Payment callback. Legal only for a confirmed member; repeat calls for
    /// an already-paid confirmation are no-ops (payment providers retry).
    pub async fn mark_paid(
        &self,
        ctx: &RequestContext,
        confirmation_id: Uuid,
    ) -> Result<Confirmation, WorkflowError> {
        let group_id = self
            .groups
            .get_confirmation(confirmation_id)
            .await?
            .ok_or(WorkflowError::ConfirmationNotFound(confirmation_id))?
            .group_id;

        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;

        let mut confirmation = self
            .groups
            .get_confirmation(confirmation_id)
            .await?
            .ok_or(WorkflowError::ConfirmationNotFound(confirmation_id))?;
        if confirmation.confirmed != Some(true) {
            return Err(WorkflowError::PaymentNotAllowed);
        }
        if confirmation.payment_status == PaymentStatus::Paid {
            return Ok(confirmation);
        }

        confirmation.payment_status = PaymentStatus::Paid;
        confirmation.updated_at = Utc::now();
        self.groups.update_confirmation(&confirmation).await?;

        let group = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?;
        if matches!(group.status, GroupStatus::Confirmed | GroupStatus::Full) {
            self.interests
                .mark_converted(confirmation.interest_id)
                .await?;
        }

        self.events.emit(DomainEvent::PaymentRecorded(PaymentRecordedEvent {
            group_id,
            confirmation_id,
            timestamp: Utc::now().timestamp(),
        }));
        tracing::info!(
            group_id = %group_id,
            confirmation_id = %confirmation_id,
            actor = ?ctx.actor,
            "payment recorded"
        );
        Ok(confirmation)
    }

    /// Deadline sweep: resolve every pending confirmation past its deadline
    /// as a decline for sizing purposes. Idempotent; a failure on one group
    /// never blocks the others. Returns the number of expired confirmations.
    pub async fn sweep_expired(&self, ctx: &RequestContext) -> Result<usize, WorkflowError> {
        let now = Utc::now();
        let group_ids = self.groups.groups_with_expired_pending(now).await?;
        let mut expired_total = 0;
        for group_id in group_ids {
            match self.sweep_group(group_id, now).await {
                Ok(expired) => expired_total += expired,
                Err(e) => {
                    tracing::warn!(group_id = %group_id, error = %e, "deadline sweep failed for group");
                }
            }
        }
        if expired_total > 0 {
            tracing::info!(expired = expired_total, actor = ?ctx.actor, "deadline sweep resolved confirmations");
        }
        Ok(expired_total)
    }

    async fn sweep_group(&self, group_id: Uuid, now: DateTime<Utc>) -> Result<usize, WorkflowError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;

        let confirmations = self.groups.confirmations_for(group_id).await?;
        let mut expired = 0;
        for mut confirmation in confirmations {
            if confirmation.is_expired_at(now) {
                self.expire_confirmation(&mut confirmation, now).await?;
                expired += 1;
            }
        }
        if expired > 0 {
            self.recompute(group_id).await?;
        }
        Ok(expired)
    }

    /// Emit the dispatch payload for every member still awaiting a response,
    /// stamping `dispatched_at`. The notification collaborator does the
    /// actual sending; the engine only hands over token and deadline.
    pub async fn dispatch_confirmations(
        &self,
        ctx: &RequestContext,
        group_id: Uuid,
    ) -> Result<Vec<DispatchEntry>, WorkflowError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;

        let group = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?;
        if group.status.is_terminal() {
            return Err(WorkflowError::GroupClosed);
        }

        let now = Utc::now();
        let mut entries = Vec::new();
        for mut confirmation in self.groups.confirmations_for(group_id).await? {
            if confirmation.is_resolved() || now >= confirmation.expires_at {
                continue;
            }
            confirmation.dispatched_at = Some(now);
            confirmation.updated_at = now;
            self.groups.update_confirmation(&confirmation).await?;
            entries.push(DispatchEntry {
                confirmation_id: confirmation.id,
                member_name: confirmation.member_name.clone(),
                member_email: confirmation.member_email.clone(),
                token: confirmation.token.clone(),
                expires_at: confirmation.expires_at,
            });
        }

        self.events
            .emit(DomainEvent::ConfirmationsDispatched(ConfirmationsDispatchedEvent {
                group_id,
                pending_members: entries.len(),
                timestamp: now.timestamp(),
            }));
        tracing::info!(group_id = %group_id, pending = entries.len(), actor = ?ctx.actor, "confirmations dispatched");
        Ok(entries)
    }

    /// Operator override: cancel a group outright. Unconfirmed members'
    /// interests return to the open pool.
    pub async fn cancel_group(
        &self,
        ctx: &RequestContext,
        group_id: Uuid,
        notes: Option<String>,
    ) -> Result<Group, WorkflowError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;

        let before = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?;
        if before.status == GroupStatus::Cancelled {
            return Ok(before);
        }
        if before.status == GroupStatus::Full {
            return Err(WorkflowError::GroupClosed);
        }

        let group = self
            .update_group_with(group_id, |g| {
                g.status = GroupStatus::Cancelled;
                if let Some(n) = &notes {
                    g.admin_notes = Some(n.clone());
                }
            })
            .await?;

        let confirmations = self.groups.confirmations_for(group_id).await?;
        self.rollback_unconfirmed(&confirmations).await?;

        self.events
            .emit(DomainEvent::GroupStatusChanged(GroupStatusChangedEvent {
                group_id,
                from: before.status.as_str().to_string(),
                to: GroupStatus::Cancelled.as_str().to_string(),
                current_size: group.current_size,
                timestamp: Utc::now().timestamp(),
            }));
        tracing::info!(group_id = %group_id, actor = ?ctx.actor, "group cancelled by operator");
        Ok(group)
    }

    /// Operator note update; no status effect.
    pub async fn set_admin_notes(
        &self,
        _ctx: &RequestContext,
        group_id: Uuid,
        notes: String,
    ) -> Result<Group, WorkflowError> {
        let lock = self.lock_for(group_id);
        let _guard = lock.lock().await;
        self.update_group_with(group_id, |g| {
            g.admin_notes = Some(notes.clone());
        })
        .await
    }

    fn lock_for(&self, group_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("group lock registry poisoned");
        locks
            .entry(group_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load-apply-store with bounded retry on version conflicts, so a
    /// concurrent out-of-band update never surfaces to the caller.
    async fn update_group_with<F>(&self, group_id: Uuid, mut apply: F) -> Result<Group, WorkflowError>
    where
        F: FnMut(&mut Group),
    {
        let mut attempts = 0;
        loop {
            let mut group = self
                .groups
                .get_group(group_id)
                .await?
                .ok_or(WorkflowError::GroupNotFound(group_id))?;
            apply(&mut group);
            group.updated_at = Utc::now();
            match self.groups.update_group(&group).await {
                Ok(()) => {
                    // Mirror the store-side bump so the returned snapshot is
                    // current.
                    group.version += 1;
                    return Ok(group);
                }
                Err(StoreError::VersionConflict(_)) if attempts + 1 < MAX_UPDATE_ATTEMPTS => {
                    attempts += 1;
                    tracing::debug!(group_id = %group_id, attempts, "group update conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Recompute `current_size` and the group status from the confirmation
    /// tally. Must be called with the group's lock held.
    async fn recompute(&self, group_id: Uuid) -> Result<Group, WorkflowError> {
        let confirmations = self.groups.confirmations_for(group_id).await?;
        let confirmed_count = confirmations.iter().filter(|c| c.is_confirmed()).count() as i32;
        let all_resolved = confirmations.iter().all(|c| c.is_resolved());

        let before = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or(WorkflowError::GroupNotFound(group_id))?
            .status;

        let group = self
            .update_group_with(group_id, |g| {
                g.current_size = confirmed_count;
                g.status = derive_status(g.status, confirmed_count, g.min_size, g.max_size, all_resolved);
            })
            .await?;

        if group.status != before {
            self.events
                .emit(DomainEvent::GroupStatusChanged(GroupStatusChangedEvent {
                    group_id,
                    from: before.as_str().to_string(),
                    to: group.status.as_str().to_string(),
                    current_size: group.current_size,
                    timestamp: Utc::now().timestamp(),
                }));
            match group.status {
                GroupStatus::Cancelled => self.rollback_unconfirmed(&confirmations).await?,
                GroupStatus::Confirmed | GroupStatus::Full => {
                    self.convert_paid_members(&confirmations).await?
                }
                GroupStatus::Forming => {}
            }
        }
        Ok(group)
    }

    async fn expire_confirmation(
        &self,
        confirmation: &mut Confirmation,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        confirmation.confirmed = Some(false);
        confirmation.decline_reason = Some(EXPIRED_REASON.to_string());
        confirmation.updated_at = now;
        self.groups.update_confirmation(confirmation).await?;
        // The member never answered; their interest goes back to the open
        // pool and stays eligible for future clustering runs.
        self.interests
            .release_to_open(&[confirmation.interest_id])
            .await?;
        tracing::debug!(
            confirmation_id = %confirmation.id,
            group_id = %confirmation.group_id,
            "confirmation expired past deadline"
        );
        Ok(())
    }

    /// On group cancellation: any member interest still MATCHED without a
    /// confirmed response returns to OPEN. Confirmed members keep theirs.
    async fn rollback_unconfirmed(
        &self,
        confirmations: &[Confirmation],
    ) -> Result<(), WorkflowError> {
        for confirmation in confirmations {
            if confirmation.is_confirmed() {
                continue;
            }
            if let Some(interest) = self.interests.get(confirmation.interest_id).await? {
                if interest.status == InterestStatus::Matched {
                    self.interests
                        .release_to_open(&[confirmation.interest_id])
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Members who paid while the group was still forming convert as soon as
    /// the group locks in.
    async fn convert_paid_members(
        &self,
        confirmations: &[Confirmation],
    ) -> Result<(), WorkflowError> {
        for confirmation in confirmations {
            if confirmation.is_confirmed() && confirmation.payment_status == PaymentStatus::Paid {
                self.interests
                    .mark_converted(confirmation.interest_id)
                    .await?;
            }
        }
        Ok(())
    }
}
