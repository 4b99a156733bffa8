//! # REST API for Reminder Scheduling
//!
//! Inspect the reminder state of a birthday and trigger the scheduler's bulk
//! operations by hand.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};

use super::error_status;
use crate::backend::io::rest::mappers::reminder_mapper::ReminderMapper;
use crate::backend::AppState;
use shared::{ConsistencyCheckResponse, ReminderStatusResponse, RescheduleResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reschedule", post(reschedule_all))
        .route("/check", post(run_consistency_check))
        .route("/:id", get(get_reminder_status))
}

pub async fn get_reminder_status(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    info!("GET /api/reminders/{}", id);

    // Unknown ids are a 404 rather than "unscheduled"
    if let Err(e) = state.birthday_service.get_birthday(id).await {
        return (error_status(&e), e.to_string()).into_response();
    }

    let scheduler = &state.reminder_scheduler;
    let response = ReminderStatusResponse {
        birthday_id: id,
        status: ReminderMapper::to_status(
            scheduler.reminder_state(id),
            scheduler.job_pending(id),
            scheduler.alarm_pending(id),
        ),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn reschedule_all(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/reminders/reschedule");

    match state.reminder_scheduler.schedule_all_reminders().await {
        Ok(summary) => {
            let response = RescheduleResponse {
                scheduled: summary.scheduled,
                failed: summary.failed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to reschedule reminders: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error rescheduling reminders").into_response()
        }
    }
}

pub async fn run_consistency_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/reminders/check");

    match state.reminder_scheduler.daily_consistency_check().await {
        Ok(report) => {
            let response = ConsistencyCheckResponse {
                checked: report.checked,
                repaired: report.repaired,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Consistency check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error running consistency check").into_response()
        }
    }
}
