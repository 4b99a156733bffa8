/// Test utilities for the CSV storage backend
///
/// The temporary directory lives as long as the environment, so test data is
/// removed even if a test panics.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

use super::birthday_repository::BirthdayRepository;
use super::connection::CsvConnection;
use crate::backend::domain::models::birthday::{Birthday, CalendarDate};

pub struct TestEnvironment {
    pub connection: CsvConnection,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            _temp_dir: temp_dir,
        })
    }

    pub fn repository(&self) -> Arc<BirthdayRepository> {
        Arc::new(BirthdayRepository::new(self.connection.clone()))
    }
}

/// Enabled Gregorian birthday born in 1990, reminded one day before
pub fn sample_birthday(name: &str, month: u32, day: u32) -> Birthday {
    Birthday {
        id: 0,
        name: name.to_string(),
        calendar_date: CalendarDate::gregorian(1990, month, day),
        reminder_days_before: 1,
        enabled: true,
        relationship: String::new(),
        notes: String::new(),
        sort_order: 0,
        created_at: Utc::now(),
    }
}
