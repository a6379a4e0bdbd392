use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use troupe_api::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "troupe_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = troupe_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Troupe API on port {}", config.server.port);

    let destinations = troupe_store::MemoryDestinationRepository::load_from_file(&config.catalog.path)
        .expect("Failed to load destination catalog");

    let state = AppState::new(
        config.business_rules.clone(),
        Arc::new(troupe_store::MemoryInterestRepository::new()),
        Arc::new(troupe_store::MemoryGroupRepository::new()),
        Arc::new(destinations),
    );

    // Background deadline sweep
    tokio::spawn(troupe_api::worker::start_deadline_sweeper(
        state.workflow.clone(),
        Duration::from_secs(config.business_rules.sweep_interval_seconds),
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
