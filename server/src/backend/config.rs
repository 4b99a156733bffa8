//! # Service Configuration
//!
//! Settings read from `config.yaml` in the data directory. A missing file
//! means defaults; a present file may set any subset of the keys.
//!
//! ```yaml
//! bind_address: "127.0.0.1:3000"
//! reminder_hour: 9
//! reminder_minute: 0
//! backoff_min_secs: 15
//! max_attempts: 5
//! daily_check_interval_secs: 86400
//! alarm_poll_interval_secs: 60
//! clock_watch_interval_secs: 60
//! clock_drift_tolerance_secs: 120
//! notifications_enabled: true
//! ```

use anyhow::{Context, Result};
use chrono::NaiveTime;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::backend::domain::reminder_scheduler::ReminderSettings;
use crate::backend::io::alarm::TokioAlarmClock;
use crate::backend::io::job_queue::BackoffPolicy;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Reminder time {hour:02}:{minute:02} is not a valid time of day")]
    InvalidReminderTime { hour: u32, minute: u32 },
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub reminder_hour: u32,
    pub reminder_minute: u32,
    /// Wait after the first failed delivery; later attempts wait multiples of it
    pub backoff_min_secs: u64,
    pub max_attempts: u32,
    pub daily_check_interval_secs: u64,
    /// Longest the alarm sleeps before re-reading the wall clock
    pub alarm_poll_interval_secs: u64,
    pub clock_watch_interval_secs: u64,
    pub clock_drift_tolerance_secs: u64,
    pub notifications_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            reminder_hour: 9,
            reminder_minute: 0,
            backoff_min_secs: BackoffPolicy::DEFAULT_MIN_BACKOFF.as_secs(),
            max_attempts: BackoffPolicy::DEFAULT_MAX_ATTEMPTS,
            daily_check_interval_secs: 24 * 60 * 60,
            alarm_poll_interval_secs: TokioAlarmClock::DEFAULT_POLL_INTERVAL.as_secs(),
            clock_watch_interval_secs: 60,
            clock_drift_tolerance_secs: 120,
            notifications_enabled: true,
        }
    }
}

impl ServiceConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let yaml_content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ServiceConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reminder_time()?;
        for (name, value) in [
            ("max_attempts", u64::from(self.max_attempts)),
            ("daily_check_interval_secs", self.daily_check_interval_secs),
            ("alarm_poll_interval_secs", self.alarm_poll_interval_secs),
            ("clock_watch_interval_secs", self.clock_watch_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue(name));
            }
        }
        Ok(())
    }

    pub fn reminder_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::from_hms_opt(self.reminder_hour, self.reminder_minute, 0).ok_or(
            ConfigError::InvalidReminderTime {
                hour: self.reminder_hour,
                minute: self.reminder_minute,
            },
        )
    }

    /// Linear backoff; the minimum wait never drops below the default 15 seconds
    pub fn backoff_policy(&self) -> BackoffPolicy {
        let min_backoff = Duration::from_secs(self.backoff_min_secs).max(BackoffPolicy::DEFAULT_MIN_BACKOFF);
        BackoffPolicy::linear(min_backoff, self.max_attempts)
    }

    pub fn reminder_settings(&self) -> Result<ReminderSettings, ConfigError> {
        Ok(ReminderSettings {
            reminder_time: self.reminder_time()?,
            backoff: self.backoff_policy(),
        })
    }

    pub fn daily_check_interval(&self) -> Duration {
        Duration::from_secs(self.daily_check_interval_secs)
    }

    pub fn alarm_poll_interval(&self) -> Duration {
        Duration::from_secs(self.alarm_poll_interval_secs)
    }

    pub fn clock_watch_interval(&self) -> Duration {
        Duration::from_secs(self.clock_watch_interval_secs)
    }

    pub fn clock_drift_tolerance(&self) -> Duration {
        Duration::from_secs(self.clock_drift_tolerance_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServiceConfig::load(&temp_dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.reminder_time().unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_partial_file_overrides_some_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "reminder_hour: 8\nreminder_minute: 30\nbackoff_min_secs: 60\n").unwrap();

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.reminder_time().unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.backoff_policy().min_backoff, Duration::from_secs(60));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_backoff_is_clamped_to_minimum() {
        let config = ServiceConfig {
            backoff_min_secs: 1,
            ..Default::default()
        };
        assert_eq!(config.backoff_policy().min_backoff, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        std::fs::write(&path, "reminder_hour: 25\n").unwrap();
        let err = ServiceConfig::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidReminderTime { hour: 25, minute: 0 })
        );

        std::fs::write(&path, "clock_watch_interval_secs: 0\n").unwrap();
        let err = ServiceConfig::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::ZeroValue("clock_watch_interval_secs"))
        );

        std::fs::write(&path, "reminder_hour: [not, a, number]\n").unwrap();
        assert!(ServiceConfig::load(&path).is_err());
    }
}
