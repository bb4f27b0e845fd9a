//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/places/:place_id/focus", post(focus_handler))
        .route("/places/:place_id/exit", post(exit_handler))
        .route("/places/:place_id/review", post(review_handler))
        .route("/places/:place_id/reviewed", get(reviewed_handler))
        .route("/lifecycle", post(lifecycle_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/profile", get(profile_handler))
        .route("/profile/reviews", get(reviews_handler))
        .route("/profile/reset", post(profile_reset_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
