//! Close-window arithmetic: which timeframes are about to close, and how long
//! the main loop may sleep before it has to look again.

use std::time::Duration;

use chrono::{DateTime, Utc};

use common::{CloseCheck, ScheduleSettings, Timeframe};

/// Inclusive range on seconds-to-close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseBand {
    pub lower: f64,
    pub upper: f64,
}

impl CloseBand {
    pub fn contains(&self, seconds_to_close: f64) -> bool {
        self.lower <= seconds_to_close && seconds_to_close <= self.upper
    }
}

/// The coarse band drives upcoming-close announcements; the tighter check
/// band decides whether a pair is fetched and classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseBands {
    pub announce: CloseBand,
    pub check: CloseBand,
}

impl CloseBands {
    pub fn from_settings(settings: &ScheduleSettings) -> Self {
        let window = settings.close_window_secs as f64;
        let lower = window - settings.band_below_secs as f64;
        Self {
            announce: CloseBand {
                lower,
                upper: window + settings.announce_band_above_secs as f64,
            },
            check: CloseBand {
                lower,
                upper: window + settings.check_band_above_secs as f64,
            },
        }
    }
}

/// Outcome of one scheduling decision.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    /// Every configured timeframe, in table order.
    pub checks: Vec<CloseCheck>,
    /// Inside the announce band.
    pub announce: Vec<CloseCheck>,
    /// Inside the check band; these get fetched and classified.
    pub due: Vec<CloseCheck>,
    /// Never longer than the polling floor.
    pub min_sleep: Duration,
}

/// Seconds until `timeframe`'s current bar closes, as seen at `now`.
///
/// When `now` sits exactly on a boundary the next close is a full period away.
pub fn seconds_to_close(now: DateTime<Utc>, timeframe: &Timeframe) -> f64 {
    millis_to_close(now, timeframe) as f64 / 1000.0
}

fn millis_to_close(now: DateTime<Utc>, timeframe: &Timeframe) -> i64 {
    let period_ms = timeframe.seconds as i64 * 1000;
    let offset_ms = timeframe.anchor_offset_secs as i64 * 1000;
    let elapsed_ms = (now.timestamp_millis() - offset_ms).rem_euclid(period_ms);
    period_ms - elapsed_ms
}

pub fn close_check(now: DateTime<Utc>, timeframe: &Timeframe) -> CloseCheck {
    let to_close_ms = millis_to_close(now, timeframe);
    CloseCheck {
        timeframe: timeframe.clone(),
        seconds_to_close: to_close_ms as f64 / 1000.0,
        closes_at: now + chrono::Duration::milliseconds(to_close_ms),
    }
}

/// Decide which timeframes need attention at `now`.
pub fn plan(
    now: DateTime<Utc>,
    timeframes: &[Timeframe],
    bands: &CloseBands,
    polling_floor: Duration,
) -> SchedulePlan {
    let checks: Vec<CloseCheck> = timeframes.iter().map(|tf| close_check(now, tf)).collect();

    let announce = checks
        .iter()
        .filter(|c| bands.announce.contains(c.seconds_to_close))
        .cloned()
        .collect();
    let due = checks
        .iter()
        .filter(|c| bands.check.contains(c.seconds_to_close))
        .cloned()
        .collect();

    let min_sleep = checks
        .iter()
        .map(|c| Duration::from_secs_f64(c.seconds_to_close.max(0.0)))
        .fold(polling_floor, Duration::min);

    SchedulePlan {
        checks,
        announce,
        due,
        min_sleep,
    }
}
