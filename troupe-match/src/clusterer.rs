use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use troupe_catalog::{Destination, DestinationRepository, PricingEngine};
use troupe_core::context::RequestContext;
use troupe_core::events::EventSink;
use troupe_core::interest::{Interest, InterestStatus};
use troupe_core::repository::{InterestRepository, StoreError};
use troupe_group::models::{Confirmation, Group, GroupStatus};
use troupe_group::repository::GroupRepository;
use troupe_shared::models::events::{DomainEvent, GroupFormedEvent};
use uuid::Uuid;

use crate::compat::{partition, Candidate};
use crate::ClusterError;

/// Knobs for a clustering run, sourced from configuration.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    /// How long members get to answer once a group is formed.
    pub confirmation_window: Duration,
    /// Minimum gap between unforced runs; `force` bypasses it.
    pub min_rerun_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ClusterRunReport {
    pub clusters_created: usize,
    pub interests_matched: usize,
    pub destinations_considered: usize,
    /// True when an unforced run was throttled by `min_rerun_interval`.
    pub skipped: bool,
}

/// Batch matcher: turns pools of open interests into priced, forming groups
/// with one pending confirmation per member.
pub struct ClusterEngine {
    interests: Arc<dyn InterestRepository>,
    groups: Arc<dyn GroupRepository>,
    destinations: Arc<dyn DestinationRepository>,
    pricing: PricingEngine,
    events: Arc<dyn EventSink>,
    settings: ClusterSettings,
    last_run_at: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl ClusterEngine {
    pub fn new(
        interests: Arc<dyn InterestRepository>,
        groups: Arc<dyn GroupRepository>,
        destinations: Arc<dyn DestinationRepository>,
        events: Arc<dyn EventSink>,
        settings: ClusterSettings,
    ) -> Self {
        Self {
            interests,
            groups,
            destinations,
            pricing: PricingEngine::new(),
            events,
            settings,
            last_run_at: std::sync::Mutex::new(None),
        }
    }

    /// One clustering pass over every destination with open interests.
    ///
    /// Idempotent with respect to already-matched interests: only OPEN ones
    /// enter a pool, and claims are atomic, so racing runs never double-match.
    pub async fn run(&self, ctx: &RequestContext, force: bool) -> Result<ClusterRunReport, ClusterError> {
        let now = Utc::now();
        if !force && self.recently_ran(now) {
            tracing::debug!("clustering run throttled; pass force=true to override");
            return Ok(ClusterRunReport {
                skipped: true,
                ..Default::default()
            });
        }
        *self.last_run_at.lock().expect("last_run_at poisoned") = Some(now);

        let mut report = ClusterRunReport::default();
        for destination_id in self.interests.destinations_with_open().await? {
            report.destinations_considered += 1;
            match self.run_for_destination(ctx, destination_id).await {
                Ok((created, matched)) => {
                    report.clusters_created += created;
                    report.interests_matched += matched;
                }
                Err(e) => {
                    // One destination's trouble must not block the others.
                    tracing::warn!(destination_id = %destination_id, error = %e, "clustering failed for destination");
                }
            }
        }
        tracing::info!(
            clusters_created = report.clusters_created,
            interests_matched = report.interests_matched,
            actor = ?ctx.actor,
            "clustering run finished"
        );
        Ok(report)
    }

    fn recently_ran(&self, now: DateTime<Utc>) -> bool {
        self.last_run_at
            .lock()
            .expect("last_run_at poisoned")
            .map(|last| now - last < self.settings.min_rerun_interval)
            .unwrap_or(false)
    }

    async fn run_for_destination(
        &self,
        ctx: &RequestContext,
        destination_id: Uuid,
    ) -> Result<(usize, usize), ClusterError> {
        let Some(destination) = self.destinations.get(destination_id).await? else {
            tracing::warn!(destination_id = %destination_id, "open interests reference unknown destination");
            return Ok((0, 0));
        };
        if !destination.is_active {
            return Ok((0, 0));
        }

        let pool = self.interests.open_for_destination(destination_id).await?;
        let candidates = partition(&pool, destination.min_group_size, destination.max_group_size);
        if candidates.is_empty() {
            // Not enough compatible seats yet. The expected steady state, not
            // an error.
            tracing::debug!(
                destination_id = %destination_id,
                pool = pool.len(),
                "insufficient pool, no group formed"
            );
            return Ok((0, 0));
        }

        let mut created = 0;
        let mut matched = 0;
        for candidate in &candidates {
            match self.form_group(ctx, &destination, candidate).await {
                Ok(_group) => {
                    created += 1;
                    matched += candidate.members.len();
                }
                Err(ClusterError::Store(StoreError::ClaimConflict(detail))) => {
                    // A concurrent run claimed one of these interests first;
                    // they will be reconsidered on the next pass.
                    tracing::debug!(destination_id = %destination_id, %detail, "candidate lost claim race");
                }
                Err(e) => return Err(e),
            }
        }
        Ok((created, matched))
    }

    /// Claim the members and persist the group + pending confirmations.
    async fn form_group(
        &self,
        _ctx: &RequestContext,
        destination: &Destination,
        candidate: &Candidate<'_>,
    ) -> Result<Group, ClusterError> {
        let now = Utc::now();
        let group_id = Uuid::new_v4();
        let member_ids: Vec<Uuid> = candidate.members.iter().map(|m| m.id).collect();

        // Atomic all-or-nothing claim: OPEN -> MATCHED keyed by the new group
        // id. Losing the race leaves every interest untouched.
        self.interests
            .claim_for_group(&member_ids, group_id)
            .await?;

        let breakdown =
            self.pricing
                .quote(destination.base_price, candidate.seats as u32, &destination.discount);
        let expires_at = now + self.settings.confirmation_window;

        let group = Group {
            id: group_id,
            destination_id: destination.id,
            name: format!("{} · {}", destination.name, candidate.window.from.format("%b %Y")),
            date_from: candidate.window.from,
            date_to: candidate.window.to,
            min_size: destination.min_group_size,
            max_size: destination.max_group_size,
            current_size: 0,
            seat_count: candidate.seats,
            base_price: destination.base_price,
            final_price_per_person: breakdown.final_price_per_person,
            pricing: breakdown,
            status: GroupStatus::Forming,
            admin_notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let confirmations: Vec<Confirmation> = candidate
            .members
            .iter()
            .map(|member| Confirmation::new(group_id, member, expires_at))
            .collect();

        if let Err(e) = self.groups.insert_group(&group, &confirmations).await {
            // Undo the claim so the interests stay eligible.
            let _ = self.interests.release_to_open(&member_ids).await;
            return Err(e.into());
        }

        self.events.emit(DomainEvent::GroupFormed(GroupFormedEvent {
            group_id,
            destination_id: destination.id,
            member_count: candidate.members.len(),
            seat_count: candidate.seats,
            final_price_per_person: group.final_price_per_person,
            timestamp: now.timestamp(),
        }));
        tracing::info!(
            group_id = %group_id,
            destination_id = %destination.id,
            members = candidate.members.len(),
            seats = candidate.seats,
            price = group.final_price_per_person,
            "group formed"
        );
        Ok(group)
    }

    /// Operator path: form a group from an explicit interest selection. Same
    /// compatibility rules, same claim discipline as the batch run.
    pub async fn form_from_interests(
        &self,
        ctx: &RequestContext,
        destination_id: Uuid,
        interest_ids: &[Uuid],
    ) -> Result<Group, ClusterError> {
        let destination = self
            .destinations
            .get(destination_id)
            .await?
            .ok_or(ClusterError::DestinationNotFound(destination_id))?;
        if !destination.is_active {
            return Err(ClusterError::DestinationInactive(destination_id));
        }

        let mut members: Vec<Interest> = Vec::with_capacity(interest_ids.len());
        for id in interest_ids {
            let interest = self
                .interests
                .get(*id)
                .await?
                .ok_or(ClusterError::InterestNotEligible(*id))?;
            if interest.status != InterestStatus::Open || interest.destination_id != destination_id {
                return Err(ClusterError::InterestNotEligible(*id));
            }
            members.push(interest);
        }

        let candidates = partition(&members, destination.min_group_size, destination.max_group_size);
        let candidate = match candidates.as_slice() {
            [single] if single.members.len() == members.len() => single,
            _ => {
                return Err(ClusterError::IncompatibleSelection(
                    "selection does not share a date window, budgets, or size bounds".into(),
                ))
            }
        };

        self.form_group(ctx, &destination, candidate).await
    }
}
