//! # Backend Module
//!
//! Contains all non-UI logic for the birthday reminder service.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, job queue, alarms, notifications)
//!     ↓
//! Domain Layer (recurrence, scheduler, services)
//!     ↓
//! Storage Layer (CSV data store)
//! ```
//!
//! `initialize_backend` wires one scheduler, shared by the REST layer and the
//! background loops. `Backend::start` spawns those loops: the reminder event
//! loop, the system event loop, the clock watcher and the daily consistency
//! check, then asks for an initial reschedule as after a boot.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::{error, info, warn};
use shared::SystemEventKind;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tower_http::cors::{Any, CorsLayer};

use crate::backend::config::ServiceConfig;
use crate::backend::domain::models::reminder::ReminderFired;
use crate::backend::domain::{
    BirthdayService, Clock, LunarCalendar, PassthroughLunarCalendar, ReminderScheduler,
    ReminderWorker, SystemClock, SystemEventService,
};
use crate::backend::io::alarm::TokioAlarmClock;
use crate::backend::io::clock_watcher::ClockWatcher;
use crate::backend::io::job_queue::{JobHandler, TokioJobQueue};
use crate::backend::io::notification::LogNotificationSink;
use crate::backend::io::rest::{birthday_apis, notification_apis, reminder_apis, system_apis};
use crate::backend::storage::{BirthdayRepository, BirthdayStorage, CsvConnection};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub birthday_service: BirthdayService,
    pub reminder_scheduler: ReminderScheduler,
    pub system_event_service: SystemEventService,
    pub notification_sink: LogNotificationSink,
}

/// Wired services plus the background work that has not been started yet
pub struct Backend {
    state: AppState,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
    fired_events: UnboundedReceiver<ReminderFired>,
}

/// Initialize the backend with all required services
pub fn initialize_backend(config: &ServiceConfig, connection: CsvConnection) -> Result<Backend> {
    info!("Setting up data store in {}", connection.base_directory().display());
    let storage: Arc<dyn BirthdayStorage> = Arc::new(BirthdayRepository::new(connection));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let lunar: Arc<dyn LunarCalendar> = Arc::new(PassthroughLunarCalendar);

    info!("Setting up reminder delivery");
    let notification_sink = LogNotificationSink::new(config.notifications_enabled);
    let (fired_tx, fired_events) = mpsc::unbounded_channel();
    let worker: Arc<dyn JobHandler> = Arc::new(ReminderWorker::new(
        Arc::new(notification_sink.clone()),
        fired_tx,
    ));
    let job_queue = Arc::new(TokioJobQueue::new(worker.clone()));
    let alarm_clock = Arc::new(TokioAlarmClock::new(
        clock.clone(),
        worker,
        config.alarm_poll_interval(),
    ));

    info!("Setting up domain model");
    let reminder_scheduler = ReminderScheduler::new(
        storage.clone(),
        job_queue,
        alarm_clock,
        clock.clone(),
        lunar.clone(),
        config.reminder_settings()?,
    );
    let birthday_service = BirthdayService::new(storage, reminder_scheduler.clone(), clock.clone(), lunar);
    let system_event_service = SystemEventService::new(reminder_scheduler.clone());

    let state = AppState {
        birthday_service,
        reminder_scheduler,
        system_event_service,
        notification_sink,
    };

    Ok(Backend {
        state,
        config: config.clone(),
        clock,
        fired_events,
    })
}

impl Backend {
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Spawn the background loops and return the state for the router
    pub fn start(self) -> AppState {
        let Backend {
            state,
            config,
            clock,
            fired_events,
        } = self;

        tokio::spawn(state.reminder_scheduler.clone().run_event_loop(fired_events));

        let (system_tx, system_rx) = mpsc::unbounded_channel();
        tokio::spawn(state.system_event_service.clone().run(system_rx));

        let watcher = ClockWatcher::new(
            clock,
            config.clock_watch_interval(),
            config.clock_drift_tolerance(),
        );
        tokio::spawn(watcher.run(system_tx.clone()));

        let scheduler = state.reminder_scheduler.clone();
        let period = config.daily_check_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; start-up is covered by the boot event
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = scheduler.daily_consistency_check().await {
                    error!("Daily consistency check failed: {:#}", e);
                }
            }
        });

        if system_tx.send(SystemEventKind::BootCompleted).is_err() {
            warn!("System event loop is not running; reminders were not rescheduled at start-up");
        }

        info!("Background reminder tasks started");
        state
    }
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    // CORS setup to allow frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("http://localhost:8080"))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/birthdays", birthday_apis::router())
        .nest("/reminders", reminder_apis::router())
        .nest("/system", system_apis::router())
        .nest("/notifications", notification_apis::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
