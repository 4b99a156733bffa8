//! # IO Module
//!
//! Everything that talks to the outside world:
//!
//! - **rest**: the axum HTTP API
//! - **job_queue** / **alarm**: the two reminder delivery paths, backed by
//!   Tokio tasks tracked in a **task_registry**
//! - **notification**: where delivered reminders are shown
//! - **clock_watcher**: turns wall-clock jumps into system events

pub mod alarm;
pub mod clock_watcher;
pub mod job_queue;
pub mod notification;
pub mod rest;
pub mod task_registry;
