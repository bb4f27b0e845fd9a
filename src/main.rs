//! Kompeito Dwell - host process for the dwell timer
//!
//! Serves the timer, lifecycle and reward endpoints to the game client.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use kompeito_dwell::{
    api::create_router,
    config::Config,
    services::{FileStore, SystemClock},
    state::{AppState, ProfileStore},
    tasks::{completion_watch_task, lifecycle_signal_task},
    timer::DwellTimer,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("kompeito_dwell={},tower_http=info", config.log_level()))
        .init();

    info!("Starting kompeito-dwell v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, dwell={}s, store={}",
        config.host,
        config.port,
        config.dwell_seconds,
        config.data_file.display()
    );

    let store = Arc::new(FileStore::open(&config.data_file).await?);
    let clock = Arc::new(SystemClock);

    let timer = DwellTimer::new(config.dwell_config(), store.clone(), clock.clone());
    let profile = ProfileStore::load(store, clock, config.username.clone()).await?;
    let state = Arc::new(AppState::new(
        Arc::clone(&timer),
        profile,
        config.kompeito_per_review,
        config.port,
        config.host.clone(),
    ));

    // Advance the client to the review step whenever a visit completes
    tokio::spawn(completion_watch_task(timer.subscribe(), state.clone()));

    // SIGUSR1/SIGUSR2 stand in for the platform's background/foreground signal
    tokio::spawn(lifecycle_signal_task(Arc::clone(&timer)));

    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /places/:place_id/focus  - Timer screen became visible");
    info!("  POST /places/:place_id/exit   - Leave once the dwell time is up");
    info!("  POST /places/:place_id/review - Post a review and earn kompeito");
    info!("  POST /lifecycle               - App moved to foreground/background");
    info!("  POST /timer/start             - Start a new session");
    info!("  POST /timer/reset             - Abandon the current session");
    info!("  GET  /profile                 - Current progress");
    info!("  GET  /status                  - Timer and visit status");
    info!("  GET  /health                  - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    timer.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
