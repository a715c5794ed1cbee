use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result, Timeframe};

const MAX_TIMEFRAME_SECS: u64 = 366 * 24 * 60 * 60;
const MAX_REFRESH_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;
const MAX_NOTIFY_ATTEMPTS: u32 = 16;
const MAX_BACKOFF_BASE_SECS: f64 = 3_600.0;
/// Offsets must stay strictly within one day.
const MAX_DISPLAY_OFFSET_MINUTES: u32 = 24 * 60 - 1;

/// Monitor settings file (TOML).
///
/// Example `config/monitor.toml`:
/// ```toml
/// symbols = ["BTCUSDT", "ETHUSDT"]
///
/// [[timeframe]]
/// name = "4h"
/// seconds = 14400
///
/// [[timeframe]]
/// name = "1w"
/// seconds = 604800
/// anchor_offset_secs = 345600
///
/// [detection]
/// wick_threshold = 2.0
/// ```
///
/// Every section other than `symbols` is optional and falls back to defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorSettings {
    /// Watchlist in Binance form, e.g. "BTCUSDT".
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(rename = "timeframe", default = "default_timeframes")]
    pub timeframes: Vec<Timeframe>,
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub universe: UniverseSettings,
    #[serde(default)]
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// A wick counts as dominant once it is at least this many bodies long.
    pub wick_threshold: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self { wick_threshold: 2.0 }
    }
}

/// Close window geometry. A bar is inspected while its seconds-to-close lie
/// in `[close_window - band_below, close_window + check_band_above]`; the
/// wider announce band uses `announce_band_above` instead.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub close_window_secs: u64,
    pub band_below_secs: u64,
    pub announce_band_above_secs: u64,
    pub check_band_above_secs: u64,
    /// Upper bound on the main loop's sleep between ticks.
    pub polling_floor_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            close_window_secs: 180,
            band_below_secs: 30,
            announce_band_above_secs: 60,
            check_band_above_secs: 30,
            polling_floor_secs: 60,
        }
    }
}

impl ScheduleSettings {
    pub fn polling_floor(&self) -> Duration {
        Duration::from_secs(self.polling_floor_secs)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Simultaneous in-flight pair inspections.
    pub max_concurrent: usize,
    /// Extra attempts after a transient failure.
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    /// Deadline for a single inspection attempt.
    pub task_deadline_secs: u64,
    pub bar_count: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            retry_attempts: 1,
            retry_delay_secs: 10,
            task_deadline_secs: 45,
            bar_count: 2,
        }
    }
}

impl FetchSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.task_deadline_secs)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct UniverseSettings {
    pub refresh_interval_secs: u64,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 3600,
        }
    }
}

impl UniverseSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifySettings {
    pub max_attempts: u32,
    /// Sleep after failed attempt `n` (from 0) is `backoff_base_secs * 2^n`.
    pub backoff_base_secs: f64,
    /// Offset applied to timestamps in alert text. Default is UTC+05:00.
    pub display_utc_offset_minutes: i32,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 1.0,
            display_utc_offset_minutes: 300,
        }
    }
}

impl NotifySettings {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_base_secs)
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            timeframes: default_timeframes(),
            detection: DetectionSettings::default(),
            schedule: ScheduleSettings::default(),
            fetch: FetchSettings::default(),
            universe: UniverseSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

impl MonitorSettings {
    /// Load and validate the settings file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        info!(
            path,
            symbols = settings.symbols.len(),
            timeframes = settings.timeframes.len(),
            "Monitor settings loaded"
        );
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: MonitorSettings =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::Config("symbols must not be empty".into()));
        }
        if self.timeframes.is_empty() {
            return Err(Error::Config("at least one [[timeframe]] is required".into()));
        }
        let mut names = HashSet::new();
        for tf in &self.timeframes {
            if tf.seconds == 0 {
                return Err(Error::Config(format!("timeframe '{}' has zero seconds", tf.name)));
            }
            if tf.seconds > MAX_TIMEFRAME_SECS {
                return Err(Error::Config(format!(
                    "timeframe '{}' is longer than {MAX_TIMEFRAME_SECS} seconds",
                    tf.name
                )));
            }
            if tf.anchor_offset_secs >= tf.seconds {
                return Err(Error::Config(format!(
                    "timeframe '{}' anchor_offset_secs must be below its period",
                    tf.name
                )));
            }
            if !names.insert(tf.name.as_str()) {
                return Err(Error::Config(format!("duplicate timeframe '{}'", tf.name)));
            }
        }
        if !(self.detection.wick_threshold > 0.0) {
            return Err(Error::Config("detection.wick_threshold must be positive".into()));
        }
        if self.schedule.polling_floor_secs == 0 {
            return Err(Error::Config("schedule.polling_floor_secs must be positive".into()));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(Error::Config("fetch.max_concurrent must be at least 1".into()));
        }
        if self.fetch.task_deadline_secs == 0 {
            return Err(Error::Config("fetch.task_deadline_secs must be positive".into()));
        }
        if self.fetch.bar_count < 2 {
            return Err(Error::Config("fetch.bar_count must be at least 2".into()));
        }
        if self.universe.refresh_interval_secs == 0
            || self.universe.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS
        {
            return Err(Error::Config(format!(
                "universe.refresh_interval_secs must be in 1..={MAX_REFRESH_INTERVAL_SECS}"
            )));
        }
        if self.notify.max_attempts == 0 || self.notify.max_attempts > MAX_NOTIFY_ATTEMPTS {
            return Err(Error::Config(format!(
                "notify.max_attempts must be in 1..={MAX_NOTIFY_ATTEMPTS}"
            )));
        }
        if !(0.0..=MAX_BACKOFF_BASE_SECS).contains(&self.notify.backoff_base_secs) {
            return Err(Error::Config(format!(
                "notify.backoff_base_secs must be in 0..={MAX_BACKOFF_BASE_SECS}"
            )));
        }
        if self.notify.display_utc_offset_minutes.unsigned_abs() > MAX_DISPLAY_OFFSET_MINUTES {
            return Err(Error::Config(format!(
                "notify.display_utc_offset_minutes must be within ±{MAX_DISPLAY_OFFSET_MINUTES}"
            )));
        }
        Ok(())
    }
}

/// Binance futures intervals watched when the file names none.
pub fn default_timeframes() -> Vec<Timeframe> {
    const HOUR: u64 = 60 * 60;
    const DAY: u64 = 24 * HOUR;
    vec![
        Timeframe::new("2h", 2 * HOUR),
        Timeframe::new("4h", 4 * HOUR),
        Timeframe::new("8h", 8 * HOUR),
        Timeframe::new("12h", 12 * HOUR),
        Timeframe::new("1d", DAY),
        Timeframe::new("3d", 3 * DAY),
        Timeframe::new("1w", 7 * DAY).with_anchor_offset(4 * DAY),
    ]
}
