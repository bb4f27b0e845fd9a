//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::state::{app_state::review_route, AppState, UserProfile};
use super::responses::{
    HealthResponse, LifecycleRequest, NavigationResponse, ReviewResponse, ReviewedResponse,
    ReviewsResponse, StatusResponse, TimerResponse,
};

/// Route shown once the review is posted
const REWARD_ROUTE: &str = "/reward";

/// Handle POST /places/:place_id/focus - The timer screen became visible
///
/// Focusing a different place than last time mounts a new screen: the timer
/// drops the session it was tracking, so reconciliation starts afresh.
pub async fn focus_handler(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<TimerResponse>, StatusCode> {
    let switched = match state.set_current_place(&place_id) {
        Ok(switched) => switched,
        Err(e) => {
            error!("Failed to record current place: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if switched {
        state.timer.remount().await;
        if let Err(e) = state.clear_pending_route() {
            warn!("Failed to clear pending route: {}", e);
        }
    }
    state.timer.reconcile_on_focus().await;
    state.record_action("focus");
    Ok(Json(TimerResponse::new(state.timer.snapshot())))
}

/// Handle POST /lifecycle - The app moved to the foreground or background
pub async fn lifecycle_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LifecycleRequest>,
) -> Json<TimerResponse> {
    info!("Lifecycle endpoint called - app is {}", request.state);
    state.timer.handle_lifecycle_change(request.state).await;
    state.record_action(&format!("lifecycle-{}", request.state));
    Json(TimerResponse::new(state.timer.snapshot()))
}

/// Handle POST /timer/start - Begin a brand-new session now
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    state.timer.start_timer(None, None).await;
    state.record_action("start");
    Json(TimerResponse::new(state.timer.snapshot()))
}

/// Handle POST /timer/reset - Abandon the current session
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<TimerResponse> {
    state.timer.reset_timer().await;
    if let Err(e) = state.clear_pending_route() {
        warn!("Failed to clear pending route: {}", e);
    }
    state.record_action("reset");
    Json(TimerResponse::new(state.timer.snapshot()))
}

/// Handle POST /places/:place_id/exit - Leave the place once time is up
pub async fn exit_handler(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<NavigationResponse>, StatusCode> {
    let current_place = match state.get_current_place() {
        Ok(place) => place,
        Err(e) => {
            error!("Failed to get current place: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    if current_place.as_deref() != Some(place_id.as_str()) {
        warn!("Exit from {} refused, the timer is not tracking that place", place_id);
        return Err(StatusCode::CONFLICT);
    }
    if !state.timer.snapshot().is_time_up {
        warn!("Exit from {} refused, dwell time not reached", place_id);
        return Err(StatusCode::CONFLICT);
    }

    state.timer.reset_timer().await;
    if let Err(e) = state.clear_pending_route() {
        warn!("Failed to clear pending route: {}", e);
    }
    state.record_action("exit");
    info!("Exit endpoint called - leaving {}", place_id);
    Ok(Json(NavigationResponse::to(review_route(Some(&place_id)))))
}

/// Handle POST /places/:place_id/review - Post a review and collect kompeito
pub async fn review_handler(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<ReviewResponse>, StatusCode> {
    let kompeito = state.kompeito_per_review;
    match state.profile.add_review(&place_id, kompeito).await {
        Ok(profile) => {
            state.record_action("review");
            Ok(Json(ReviewResponse {
                next_route: REWARD_ROUTE.to_string(),
                kompeito_awarded: kompeito,
                profile,
            }))
        }
        Err(e) => {
            error!("Failed to record review of {}: {}", place_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /places/:place_id/reviewed - Whether the place was reviewed before
pub async fn reviewed_handler(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<ReviewedResponse>, StatusCode> {
    match state.profile.is_place_reviewed(&place_id).await {
        Ok(reviewed) => Ok(Json(ReviewedResponse { place_id, reviewed })),
        Err(e) => {
            error!("Failed to check review state of {}: {}", place_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /profile/reviews - Review history and reviewed places
pub async fn reviews_handler(State(state): State<Arc<AppState>>) -> Result<Json<ReviewsResponse>, StatusCode> {
    let reviews = state.profile.reviews().await;
    let reviewed_places = state.profile.reviewed_places().await;
    match (reviews, reviewed_places) {
        (Ok(reviews), Ok(reviewed_places)) => Ok(Json(ReviewsResponse { reviews, reviewed_places })),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to read review history: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /profile/reset - Wipe all progress
pub async fn profile_reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<UserProfile>, StatusCode> {
    match state.profile.reset_stats().await {
        Ok(profile) => {
            state.record_action("profile-reset");
            Ok(Json(profile))
        }
        Err(e) => {
            error!("Failed to reset profile: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /profile - Current progress
pub async fn profile_handler(State(state): State<Arc<AppState>>) -> Json<UserProfile> {
    Json(state.profile.profile().await)
}

/// Handle GET /status - Return current timer and visit status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let current_place = match state.get_current_place() {
        Ok(place) => place,
        Err(e) => {
            error!("Failed to get current place: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let pending_route = match state.get_pending_route() {
        Ok(route) => route,
        Err(e) => {
            error!("Failed to get pending route: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: TimerResponse::new(state.timer.snapshot()),
        current_place,
        pending_route,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
