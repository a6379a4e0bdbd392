#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use troupe_api::AppState;
use troupe_catalog::{Destination, DiscountPolicy};
use troupe_core::interest::NewInterest;
use troupe_store::app_config::BusinessRules;
use troupe_store::{MemoryDestinationRepository, MemoryGroupRepository, MemoryInterestRepository};
use uuid::Uuid;

pub fn business_rules() -> BusinessRules {
    BusinessRules {
        confirmation_window_hours: 72,
        sweep_interval_seconds: 60,
        // No throttle in tests: repeated trigger calls should really re-run.
        clustering_min_rerun_seconds: 0,
        payment_base_url: "https://pay.troupe.test".into(),
        api_base_url: "http://localhost:8080".into(),
    }
}

pub fn destination(min_group_size: i32, max_group_size: i32) -> Destination {
    Destination {
        id: Uuid::new_v4(),
        name: "Ladakh Circuit".into(),
        country: "India".into(),
        base_price: 45_000.0,
        min_group_size,
        max_group_size,
        discount: DiscountPolicy {
            max_discount: 0.25,
            discount_per_member: 0.03,
        },
        itinerary: Vec::new(),
        is_active: true,
    }
}

pub fn state_with(destinations: Vec<Destination>) -> AppState {
    AppState::new(
        business_rules(),
        Arc::new(MemoryInterestRepository::new()),
        Arc::new(MemoryGroupRepository::new()),
        Arc::new(MemoryDestinationRepository::with_destinations(destinations)),
    )
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

pub fn interest_request(
    destination_id: Uuid,
    name: &str,
    num_people: i32,
    from: NaiveDate,
    to: NaiveDate,
) -> NewInterest {
    NewInterest {
        destination_id,
        user_name: name.into(),
        user_email: format!("{}@example.com", name.to_lowercase()),
        user_phone: None,
        num_people,
        date_from: from,
        date_to: to,
        budget_min: None,
        budget_max: None,
        special_requests: None,
        client_uuid: Uuid::new_v4().to_string(),
    }
}
