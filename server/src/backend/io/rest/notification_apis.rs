//! # REST API for Notifications
//!
//! Lists the notifications currently shown, dismisses them, toggles the
//! permission to show them and sends a test reminder through the same sink the
//! scheduled reminders use.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use log::{info, warn};

use crate::backend::domain::reminder_worker::{reminder_body, reminder_title};
use crate::backend::io::notification::{DeliveryError, NotificationMessage, NotificationSink};
use crate::backend::io::rest::mappers::reminder_mapper::ReminderMapper;
use crate::backend::AppState;
use shared::{NotificationListResponse, NotificationPermissionRequest, TestNotificationRequest};

/// Dedupe key of the test notification; repeated tests replace each other
pub const TEST_NOTIFICATION_KEY: &str = "birthday_reminder_test";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/test", post(send_test_notification))
        .route("/permission", put(set_permission))
        .route("/:key", delete(dismiss_notification))
}

pub async fn list_notifications(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/notifications");

    let response = NotificationListResponse {
        permission_granted: state.notification_sink.has_permission(),
        notifications: state
            .notification_sink
            .active_notifications()
            .into_iter()
            .map(ReminderMapper::to_notification_dto)
            .collect(),
    };
    (StatusCode::OK, Json(response))
}

pub async fn send_test_notification(
    State(state): State<AppState>,
    Json(request): Json<TestNotificationRequest>,
) -> impl IntoResponse {
    info!("POST /api/notifications/test - request: {:?}", request);

    let message = NotificationMessage {
        title: reminder_title(&request.name, request.days_before),
        body: reminder_body(&request.name, &request.relationship),
        dedupe_key: TEST_NOTIFICATION_KEY.to_string(),
    };

    match state.notification_sink.deliver(&message).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(DeliveryError::PermissionDenied) => {
            warn!("Test notification blocked: permission denied");
            (StatusCode::FORBIDDEN, DeliveryError::PermissionDenied.to_string()).into_response()
        }
        Err(e) => {
            warn!("Test notification failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

pub async fn set_permission(
    State(state): State<AppState>,
    Json(request): Json<NotificationPermissionRequest>,
) -> impl IntoResponse {
    info!("PUT /api/notifications/permission - granted: {}", request.granted);

    state.notification_sink.set_permission_granted(request.granted);
    StatusCode::NO_CONTENT
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/notifications/{}", key);

    if state.notification_sink.dismiss(&key) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
