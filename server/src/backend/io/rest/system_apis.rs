//! # REST API for System Events
//!
//! Lets the host report boots, package replacement and clock or timezone
//! changes. Every event re-registers all enabled reminders.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use log::{error, info};

use crate::backend::AppState;
use shared::{RescheduleResponse, SystemEventRequest};

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(post_system_event))
}

pub async fn post_system_event(
    State(state): State<AppState>,
    Json(request): Json<SystemEventRequest>,
) -> impl IntoResponse {
    info!("POST /api/system/events - event: {}", request.event);

    match state.system_event_service.handle_event(request.event).await {
        Ok(summary) => {
            let response = RescheduleResponse {
                scheduled: summary.scheduled,
                failed: summary.failed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to handle {}: {}", request.event, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error handling system event").into_response()
        }
    }
}
