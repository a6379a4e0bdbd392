use std::sync::Arc;

use chrono::Duration;
use troupe_catalog::DestinationRepository;
use troupe_core::repository::InterestRepository;
use troupe_group::repository::GroupRepository;
use troupe_group::workflow::ConfirmationWorkflow;
use troupe_match::{ClusterEngine, ClusterSettings};
use troupe_store::app_config::BusinessRules;
use troupe_store::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub interests: Arc<dyn InterestRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub destinations: Arc<dyn DestinationRepository>,
    pub workflow: Arc<ConfirmationWorkflow>,
    pub clusterer: Arc<ClusterEngine>,
    pub events: EventBus,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Wire the engine together over the given repositories.
    pub fn new(
        business_rules: BusinessRules,
        interests: Arc<dyn InterestRepository>,
        groups: Arc<dyn GroupRepository>,
        destinations: Arc<dyn DestinationRepository>,
    ) -> Self {
        let events = EventBus::new(256);
        let sink = Arc::new(events.clone());

        let workflow = Arc::new(ConfirmationWorkflow::new(
            groups.clone(),
            interests.clone(),
            sink.clone(),
        ));
        let clusterer = Arc::new(ClusterEngine::new(
            interests.clone(),
            groups.clone(),
            destinations.clone(),
            sink,
            ClusterSettings {
                confirmation_window: Duration::hours(business_rules.confirmation_window_hours),
                min_rerun_interval: Duration::seconds(business_rules.clustering_min_rerun_seconds),
            },
        ));

        Self {
            interests,
            groups,
            destinations,
            workflow,
            clusterer,
            events,
            business_rules,
        }
    }
}
