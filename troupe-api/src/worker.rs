use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use troupe_core::context::RequestContext;
use troupe_group::workflow::ConfirmationWorkflow;

/// Background deadline sweeper: every tick, resolve pending confirmations
/// whose window has closed. Lazy expiry on the response path covers the gap
/// between ticks, so the cadence is a freshness knob, not a correctness one.
pub async fn start_deadline_sweeper(workflow: Arc<ConfirmationWorkflow>, interval: Duration) {
    info!("Deadline sweeper started, interval {:?}", interval);
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; that is fine, sweeps are idempotent.
    loop {
        ticker.tick().await;
        let ctx = RequestContext::system();
        match workflow.sweep_expired(&ctx).await {
            Ok(0) => {}
            Ok(expired) => info!(expired, "deadline sweep resolved confirmations"),
            Err(e) => error!(error = %e, "deadline sweep pass failed"),
        }
    }
}
