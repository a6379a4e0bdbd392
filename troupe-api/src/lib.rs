use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod clustering;
pub mod error;
pub mod groups;
pub mod interests;
pub mod state;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route(
            "/v1/interests",
            post(interests::create_interest).get(interests::list_interests),
        )
        .route("/v1/clustering/trigger", post(clustering::trigger_clustering))
        .route("/v1/groups", get(groups::list_groups))
        .route("/v1/groups/{id}", get(groups::get_group))
        .route(
            "/v1/groups/{id}/confirm/{token}",
            get(groups::confirmation_view).post(groups::respond),
        )
        .route(
            "/v1/groups/{id}/send-confirmations",
            post(groups::send_confirmations),
        )
        .route("/v1/groups/{id}/stream", get(groups::group_events))
        .route("/v1/confirmations/{id}/paid", post(groups::mark_paid))
        .route("/v1/admin/groups", post(admin::form_group))
        .route("/v1/admin/groups/{id}/status", post(admin::override_group))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
