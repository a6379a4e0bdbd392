use axum::{extract::State, Json};
use serde::Deserialize;
use troupe_core::context::RequestContext;
use troupe_match::ClusterRunReport;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct TriggerRequest {
    /// Bypass the minimum-interval throttle between runs.
    #[serde(default)]
    pub force: bool,
}

/// POST /v1/clustering/trigger
/// Run the Clusterer once over every destination with open interests.
pub async fn trigger_clustering(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<ClusterRunReport>, AppError> {
    let ctx = RequestContext::system();
    let report = state.clusterer.run(&ctx, req.force).await?;
    Ok(Json(report))
}
