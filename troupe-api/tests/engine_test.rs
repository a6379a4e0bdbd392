mod common;

use chrono::{Duration, Utc};
use common::{day, destination, interest_request, state_with};
use troupe_api::AppState;
use troupe_core::context::RequestContext;
use troupe_core::interest::{Interest, InterestStatus};
use troupe_group::models::{Confirmation, GroupStatus, PaymentStatus, EXPIRED_REASON};
use troupe_group::workflow::WorkflowError;
use uuid::Uuid;

/// Seed `count` one-person interests with a shared June window.
async fn seed_interests(state: &AppState, destination_id: Uuid, count: usize) -> Vec<Interest> {
    let mut out = Vec::new();
    for n in 0..count {
        let req = interest_request(
            destination_id,
            &format!("Member{}", n),
            1,
            day(6, 1),
            day(6, 20),
        );
        let (stored, created) = state.interests.create(req.into_interest()).await.unwrap();
        assert!(created);
        out.push(stored);
    }
    out
}

async fn cluster_once(state: &AppState) -> usize {
    let ctx = RequestContext::system();
    state.clusterer.run(&ctx, true).await.unwrap().clusters_created
}

#[tokio::test]
async fn clustering_forms_a_priced_group_with_pending_confirmations() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;

    assert_eq!(cluster_once(&state).await, 1);

    let groups = state.groups.list_groups(None, None).await.unwrap();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.status, GroupStatus::Forming);
    assert_eq!(group.current_size, 0);
    assert_eq!(group.seat_count, 4);
    // 4 travelers: discount = 0.03 * 3 = 0.09 -> 45000 * 0.91
    assert_eq!(group.final_price_per_person, 40_950.0);

    let confirmations = state.groups.confirmations_for(group.id).await.unwrap();
    assert_eq!(confirmations.len(), 4);
    assert!(confirmations.iter().all(|c| c.confirmed.is_none()));

    for interest in state.interests.list(None, None).await.unwrap() {
        assert_eq!(interest.status, InterestStatus::Matched);
        assert_eq!(interest.group_id, Some(group.id));
    }
}

#[tokio::test]
async fn rerunning_the_clusterer_creates_nothing_new() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;

    assert_eq!(cluster_once(&state).await, 1);
    assert_eq!(cluster_once(&state).await, 0);
}

#[tokio::test]
async fn insufficient_pool_is_a_noop_not_an_error() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 3).await;

    assert_eq!(cluster_once(&state).await, 0);
    let open = state
        .interests
        .list(None, Some(InterestStatus::Open))
        .await
        .unwrap();
    assert_eq!(open.len(), 3);
}

#[tokio::test]
async fn confirmations_drive_the_group_to_confirmed_and_payment_converts() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let confirmations = state.groups.confirmations_for(group.id).await.unwrap();
    let ctx = RequestContext::system();

    for (n, confirmation) in confirmations.iter().enumerate() {
        let outcome = state
            .workflow
            .respond(&ctx, group.id, &confirmation.token, true, None)
            .await
            .unwrap();
        // current_size always equals the confirmed count.
        assert_eq!(outcome.group.current_size, n as i32 + 1);
        assert!(outcome.payment_required);
    }

    let group = state.groups.get_group(group.id).await.unwrap().unwrap();
    assert_eq!(group.status, GroupStatus::Confirmed);
    assert_eq!(group.current_size, 4);

    for confirmation in state.groups.confirmations_for(group.id).await.unwrap() {
        let paid = state.workflow.mark_paid(&ctx, confirmation.id).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        let interest = state
            .interests
            .get(confirmation.interest_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(interest.status, InterestStatus::Converted);
    }
}

#[tokio::test]
async fn two_concurrent_confirms_resolve_exactly_once() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let token = state.groups.confirmations_for(group.id).await.unwrap()[0]
        .token
        .clone();

    let spawn_confirm = |token: String| {
        let workflow = state.workflow.clone();
        let group_id = group.id;
        tokio::spawn(async move {
            let ctx = RequestContext::system();
            workflow.respond(&ctx, group_id, &token, true, None).await
        })
    };
    let first = spawn_confirm(token.clone());
    let second = spawn_confirm(token);

    let results = [first.await.unwrap(), second.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "exactly one confirm wins");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(WorkflowError::AlreadyResponded))));

    let group = state.groups.get_group(group.id).await.unwrap().unwrap();
    assert_eq!(group.current_size, 1);
}

#[tokio::test]
async fn declining_requires_a_reason_and_cancels_the_interest() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let confirmation = state.groups.confirmations_for(group.id).await.unwrap().remove(0);
    let ctx = RequestContext::system();

    let err = state
        .workflow
        .respond(&ctx, group.id, &confirmation.token, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::MissingReason));

    state
        .workflow
        .respond(
            &ctx,
            group.id,
            &confirmation.token,
            false,
            Some("dates no longer work".into()),
        )
        .await
        .unwrap();

    let interest = state
        .interests
        .get(confirmation.interest_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(interest.status, InterestStatus::Cancelled);
    assert!(interest.group_id.is_none());

    // No re-answering: the decline is immutable.
    let err = state
        .workflow
        .respond(&ctx, group.id, &confirmation.token, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyResponded));
}

/// Push one confirmation's deadline into the past, as if the window lapsed.
async fn force_expire(state: &AppState, confirmation: &Confirmation) {
    let mut expired = confirmation.clone();
    expired.expires_at = Utc::now() - Duration::minutes(1);
    state.groups.update_confirmation(&expired).await.unwrap();
}

#[tokio::test]
async fn expiry_below_min_size_cancels_the_group_and_reopens_the_interest() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let confirmations = state.groups.confirmations_for(group.id).await.unwrap();
    let ctx = RequestContext::system();

    // Three members confirm; the fourth never answers.
    for confirmation in &confirmations[..3] {
        state
            .workflow
            .respond(&ctx, group.id, &confirmation.token, true, None)
            .await
            .unwrap();
    }
    let straggler = &confirmations[3];
    force_expire(&state, straggler).await;

    let expired = state.workflow.sweep_expired(&ctx).await.unwrap();
    assert_eq!(expired, 1);

    let group = state.groups.get_group(group.id).await.unwrap().unwrap();
    assert_eq!(group.status, GroupStatus::Cancelled);
    assert_eq!(group.current_size, 3);

    let resolved = state
        .groups
        .get_confirmation(straggler.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.confirmed, Some(false));
    assert_eq!(resolved.decline_reason.as_deref(), Some(EXPIRED_REASON));

    // The silent member is back in the pool; the three confirmed stay matched.
    let straggler_interest = state
        .interests
        .get(straggler.interest_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(straggler_interest.status, InterestStatus::Open);
    for confirmation in &confirmations[..3] {
        let interest = state
            .interests
            .get(confirmation.interest_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(interest.status, InterestStatus::Matched);
    }

    // Sweeping again changes nothing.
    assert_eq!(state.workflow.sweep_expired(&ctx).await.unwrap(), 0);
}

#[tokio::test]
async fn responding_after_the_deadline_reports_expired_and_applies_it() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let confirmation = state.groups.confirmations_for(group.id).await.unwrap().remove(0);
    force_expire(&state, &confirmation).await;

    let ctx = RequestContext::system();
    let err = state
        .workflow
        .respond(&ctx, group.id, &confirmation.token, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TokenExpired));

    // Lazy expiry resolved it without waiting for the sweep.
    let resolved = state
        .groups
        .get_confirmation(confirmation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.confirmed, Some(false));
    assert_eq!(resolved.decline_reason.as_deref(), Some(EXPIRED_REASON));
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let ctx = RequestContext::system();
    let err = state
        .workflow
        .respond(&ctx, group.id, "not-a-token", true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TokenInvalid));
}

#[tokio::test]
async fn first_capacity_confirms_win_and_later_ones_are_rejected() {
    // A destination whose capacity equals two confirmed members, with a
    // third member still pending once capacity is hit.
    let dest = destination(2, 2);
    let state = state_with(vec![dest.clone()]);
    let interests = seed_interests(&state, dest.id, 3).await;
    let ctx = RequestContext::system();

    // Form an oversubscribed group directly: capacity 2, three invited.
    let group_id = Uuid::new_v4();
    let member_ids: Vec<Uuid> = interests.iter().map(|i| i.id).collect();
    state
        .interests
        .claim_for_group(&member_ids, group_id)
        .await
        .unwrap();

    let now = Utc::now();
    let pricing = troupe_catalog::PricingEngine::new().quote(dest.base_price, 3, &dest.discount);
    let group = troupe_group::models::Group {
        id: group_id,
        destination_id: dest.id,
        name: "Ladakh Circuit · Jun 2025".into(),
        date_from: day(6, 1),
        date_to: day(6, 20),
        min_size: dest.min_group_size,
        max_size: dest.max_group_size,
        current_size: 0,
        seat_count: 3,
        base_price: dest.base_price,
        final_price_per_person: pricing.final_price_per_person,
        pricing,
        status: GroupStatus::Forming,
        admin_notes: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    let confirmations: Vec<Confirmation> = interests
        .iter()
        .map(|i| Confirmation::new(group_id, i, now + Duration::hours(72)))
        .collect();
    state
        .groups
        .insert_group(&group, &confirmations)
        .await
        .unwrap();

    state
        .workflow
        .respond(&ctx, group_id, &confirmations[0].token, true, None)
        .await
        .unwrap();
    let outcome = state
        .workflow
        .respond(&ctx, group_id, &confirmations[1].token, true, None)
        .await
        .unwrap();
    assert_eq!(outcome.group.status, GroupStatus::Full);

    // The third member's own deadline has not passed, but capacity has.
    let err = state
        .workflow
        .respond(&ctx, group_id, &confirmations[2].token, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::CapacityExceeded));

    // Declining is still possible and leaves the full group untouched.
    state
        .workflow
        .respond(
            &ctx,
            group_id,
            &confirmations[2].token,
            false,
            Some("missed the window".into()),
        )
        .await
        .unwrap();
    let group = state.groups.get_group(group_id).await.unwrap().unwrap();
    assert_eq!(group.status, GroupStatus::Full);
    assert_eq!(group.current_size, 2);
}

#[tokio::test]
async fn payment_is_rejected_for_unconfirmed_members_and_idempotent_after() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let confirmations = state.groups.confirmations_for(group.id).await.unwrap();
    let ctx = RequestContext::system();

    let err = state
        .workflow
        .mark_paid(&ctx, confirmations[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PaymentNotAllowed));

    state
        .workflow
        .respond(&ctx, group.id, &confirmations[0].token, true, None)
        .await
        .unwrap();
    let first = state.workflow.mark_paid(&ctx, confirmations[0].id).await.unwrap();
    let second = state.workflow.mark_paid(&ctx, confirmations[0].id).await.unwrap();
    assert_eq!(first.payment_status, PaymentStatus::Paid);
    assert_eq!(second.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn operator_cancel_rolls_unconfirmed_members_back_to_open() {
    let dest = destination(4, 20);
    let state = state_with(vec![dest.clone()]);
    seed_interests(&state, dest.id, 4).await;
    cluster_once(&state).await;

    let group = state.groups.list_groups(None, None).await.unwrap().remove(0);
    let ctx = RequestContext::operator("ops-1");
    let cancelled = state
        .workflow
        .cancel_group(&ctx, group.id, Some("supplier pulled out".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, GroupStatus::Cancelled);
    assert_eq!(cancelled.admin_notes.as_deref(), Some("supplier pulled out"));

    for interest in state.interests.list(None, None).await.unwrap() {
        assert_eq!(interest.status, InterestStatus::Open);
        assert!(interest.group_id.is_none());
    }
}
