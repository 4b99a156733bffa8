//! # REST API Interface Layer
//!
//! HTTP endpoints for the birthday reminder service, nested under `/api`.
//! Handlers translate shared DTOs to domain commands, call the services and
//! map domain errors onto status codes. No business logic lives here.

pub mod birthday_apis;
pub mod mappers;
pub mod notification_apis;
pub mod reminder_apis;
pub mod system_apis;

use axum::http::StatusCode;

use crate::backend::domain::models::birthday::BirthdayValidationError;
use crate::backend::domain::BirthdayServiceError;

/// Status code for an error coming out of a domain service
pub fn error_status(error: &anyhow::Error) -> StatusCode {
    if error.downcast_ref::<BirthdayValidationError>().is_some() {
        return StatusCode::BAD_REQUEST;
    }
    match error.downcast_ref::<BirthdayServiceError>() {
        Some(BirthdayServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(BirthdayServiceError::DuplicateInOrder(_)) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
