//! # Shop Configuration
//!
//! Settings the tracking core needs from the outside world.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     GARAGE_MAX_CODE_ATTEMPTS=1000                                       │
//! │     GARAGE_OPEN_HOUR=8  GARAGE_CLOSE_HOUR=17                            │
//! │     GARAGE_UTC_OFFSET_MINUTES=-300                                      │
//! │     GARAGE_RECENT_CODES=10                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/garage-tracker/shop.toml (Linux)                          │
//! │     ~/Library/Application Support/com.garage.tracker/shop.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     1000 attempts, 09:00–18:00, UTC calendar                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # shop.toml
//! [codes]
//! max_attempts = 1000
//! recent_limit = 10
//!
//! [schedule]
//! open_hour = 9
//! close_hour = 18
//!
//! [calendar]
//! utc_offset_minutes = -300   # shop's local calendar for week/month windows
//! ```

use chrono::{FixedOffset, Offset, Utc};
use garage_core::tracking::{CodeGenerator, DEFAULT_MAX_ATTEMPTS};
use garage_core::BusinessHours;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Largest UTC offset a shop calendar may use (UTC±14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Sections
// =============================================================================

/// Tracking code issuance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSettings {
    /// Random draws before falling back to a timestamp code.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How many codes `stats()` lists as recent.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_recent_limit() -> usize {
    10
}

impl Default for CodeSettings {
    fn default() -> Self {
        CodeSettings {
            max_attempts: default_max_attempts(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Bookable hours. Both ends are slot starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,

    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
}

fn default_open_hour() -> u32 {
    9
}

fn default_close_hour() -> u32 {
    18
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
        }
    }
}

/// The shop's local calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Minutes east of UTC; negative for the Americas.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

// =============================================================================
// Shop Configuration
// =============================================================================

/// Complete shop configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default)]
    pub codes: CodeSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default)]
    pub calendar: CalendarSettings,
}

impl ShopConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shop.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shop config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shop config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Shop config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if self.codes.max_attempts == 0 {
            return Err(StoreError::Config(
                "codes.max_attempts must be greater than 0".into(),
            ));
        }

        if self.codes.recent_limit == 0 {
            return Err(StoreError::Config(
                "codes.recent_limit must be greater than 0".into(),
            ));
        }

        let ScheduleSettings {
            open_hour,
            close_hour,
        } = self.schedule;
        if open_hour >= close_hour || close_hour > 23 {
            return Err(StoreError::Config(format!(
                "schedule must satisfy open_hour < close_hour <= 23, got {}..{}",
                open_hour, close_hour
            )));
        }

        if self.calendar.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(StoreError::Config(format!(
                "calendar.utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.calendar.utc_offset_minutes
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production, a map in tests).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparsable environment override");
                    None
                }
            }
        }

        if let Some(attempts) =
            parsed::<u32>("GARAGE_MAX_CODE_ATTEMPTS", lookup("GARAGE_MAX_CODE_ATTEMPTS"))
        {
            debug!(attempts, "Overriding max code attempts from environment");
            self.codes.max_attempts = attempts;
        }

        if let Some(limit) = parsed::<usize>("GARAGE_RECENT_CODES", lookup("GARAGE_RECENT_CODES")) {
            self.codes.recent_limit = limit;
        }

        if let Some(hour) = parsed::<u32>("GARAGE_OPEN_HOUR", lookup("GARAGE_OPEN_HOUR")) {
            debug!(hour, "Overriding open hour from environment");
            self.schedule.open_hour = hour;
        }

        if let Some(hour) = parsed::<u32>("GARAGE_CLOSE_HOUR", lookup("GARAGE_CLOSE_HOUR")) {
            debug!(hour, "Overriding close hour from environment");
            self.schedule.close_hour = hour;
        }

        if let Some(minutes) = parsed::<i32>(
            "GARAGE_UTC_OFFSET_MINUTES",
            lookup("GARAGE_UTC_OFFSET_MINUTES"),
        ) {
            debug!(minutes, "Overriding calendar offset from environment");
            self.calendar.utc_offset_minutes = minutes;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "garage", "tracker")
            .map(|dirs| dirs.config_dir().join("shop.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The shop's calendar offset. Falls back to UTC if out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.calendar.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours {
            open_hour: self.schedule.open_hour,
            close_hour: self.schedule.close_hour,
        }
    }

    pub fn generator(&self) -> CodeGenerator {
        CodeGenerator::new(self.codes.max_attempts)
    }
}
