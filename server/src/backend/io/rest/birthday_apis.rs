//! # REST API for Birthday Management
//!
//! Endpoints for creating, listing, updating, deleting and reordering
//! birthdays, plus the upcoming-birthdays view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde::Deserialize;

use super::error_status;
use crate::backend::domain::commands::birthday::ReorderBirthdaysCommand;
use crate::backend::io::rest::mappers::birthday_mapper::BirthdayMapper;
use crate::backend::AppState;
use shared::{CreateBirthdayRequest, ReorderBirthdaysRequest, UpdateBirthdayRequest};

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<usize>,
}

/// Create a router for birthday related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_birthdays).post(create_birthday))
        .route("/reorder", post(reorder_birthdays))
        .route("/upcoming", get(get_upcoming_birthdays))
        .route(
            "/:id",
            get(get_birthday).put(update_birthday).delete(delete_birthday),
        )
}

pub async fn list_birthdays(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/birthdays");

    match state.birthday_service.list_birthdays().await {
        Ok(birthdays) => {
            let response = BirthdayMapper::to_list_response(birthdays);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to list birthdays: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving birthdays").into_response()
        }
    }
}

pub async fn create_birthday(
    State(state): State<AppState>,
    Json(request): Json<CreateBirthdayRequest>,
) -> impl IntoResponse {
    info!("POST /api/birthdays - request: {:?}", request);

    let command = BirthdayMapper::to_create_command(request);
    match state.birthday_service.create_birthday(command).await {
        Ok(result) => {
            let response = BirthdayMapper::to_response(result);
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to create birthday: {}", e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn get_birthday(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    info!("GET /api/birthdays/{}", id);

    match state.birthday_service.get_birthday(id).await {
        Ok(birthday) => (StatusCode::OK, Json(BirthdayMapper::to_dto(birthday))).into_response(),
        Err(e) => {
            error!("Failed to get birthday {}: {}", id, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn update_birthday(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateBirthdayRequest>,
) -> impl IntoResponse {
    info!("PUT /api/birthdays/{} - request: {:?}", id, request);

    let command = BirthdayMapper::to_update_command(id, request);
    match state.birthday_service.update_birthday(command).await {
        Ok(result) => (StatusCode::OK, Json(BirthdayMapper::to_response(result))).into_response(),
        Err(e) => {
            error!("Failed to update birthday {}: {}", id, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn delete_birthday(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    info!("DELETE /api/birthdays/{}", id);

    match state.birthday_service.delete_birthday(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to delete birthday {}: {}", id, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn reorder_birthdays(
    State(state): State<AppState>,
    Json(request): Json<ReorderBirthdaysRequest>,
) -> impl IntoResponse {
    info!("POST /api/birthdays/reorder - request: {:?}", request);

    let command = ReorderBirthdaysCommand {
        birthday_ids: request.birthday_ids,
    };
    match state.birthday_service.reorder_birthdays(command).await {
        Ok(birthdays) => (StatusCode::OK, Json(BirthdayMapper::to_list_response(birthdays))).into_response(),
        Err(e) => {
            error!("Failed to reorder birthdays: {}", e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn get_upcoming_birthdays(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> impl IntoResponse {
    info!("GET /api/birthdays/upcoming - query: {:?}", query);

    match state.birthday_service.upcoming_birthdays(query.limit).await {
        Ok(result) => (StatusCode::OK, Json(BirthdayMapper::to_upcoming_response(result))).into_response(),
        Err(e) => {
            error!("Failed to compute upcoming birthdays: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving upcoming birthdays").into_response()
        }
    }
}
