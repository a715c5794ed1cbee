use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named periodic bucket, e.g. `4h` = 14 400 seconds.
///
/// Boundaries sit on the grid `anchor_offset_secs + k * seconds` measured
/// from the Unix epoch. Most Binance intervals use offset 0; weekly bars
/// close on Monday 00:00 UTC, four days after the epoch's Thursday.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub name: String,
    pub seconds: u64,
    #[serde(default)]
    pub anchor_offset_secs: u64,
}

impl Timeframe {
    pub fn new(name: impl Into<String>, seconds: u64) -> Self {
        Self {
            name: name.into(),
            seconds,
            anchor_offset_secs: 0,
        }
    }

    pub fn with_anchor_offset(mut self, offset_secs: u64) -> Self {
        self.anchor_offset_secs = offset_secs;
        self
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One period's price summary from the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    /// Nominal end of the period: `open_time + timeframe.seconds`.
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Close so far; final only once the bar has closed.
    pub close: f64,
}

/// Named single-bar candlestick pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    GravestoneDoji,
    DragonflyDoji,
    RickshawMan,
    LongLeggedDoji,
    SpinningTop,
    HighWaveCandle,
    Doji,
    PinBar,
    Hammer,
    HangingMan,
    ShootingStar,
    InvertedHammer,
    None,
}

impl Pattern {
    pub fn is_none(&self) -> bool {
        matches!(self, Pattern::None)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Pattern::GravestoneDoji => "Gravestone Doji",
            Pattern::DragonflyDoji => "Dragonfly Doji",
            Pattern::RickshawMan => "Rickshaw Man",
            Pattern::LongLeggedDoji => "Long-legged Doji",
            Pattern::SpinningTop => "Spinning Top",
            Pattern::HighWaveCandle => "High Wave Candle",
            Pattern::Doji => "Doji",
            Pattern::PinBar => "Pin Bar",
            Pattern::Hammer => "Hammer",
            Pattern::HangingMan => "Hanging Man",
            Pattern::ShootingStar => "Shooting Star",
            Pattern::InvertedHammer => "Inverted Hammer",
            Pattern::None => "None",
        };
        write!(f, "{label}")
    }
}

/// Which wick dominates the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WickSide {
    LongerLowerWick,
    LongerUpperWick,
    EqualWicks,
    NoSignificantWick,
    NoRange,
}

impl std::fmt::Display for WickSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WickSide::LongerLowerWick => write!(f, "Longer Lower Wick"),
            WickSide::LongerUpperWick => write!(f, "Longer Upper Wick"),
            WickSide::EqualWicks => write!(f, "Equal Wicks"),
            WickSide::NoSignificantWick => write!(f, "No Significant Wick"),
            WickSide::NoRange => write!(f, "No Range"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternResult {
    pub pattern: Pattern,
    pub wick_side: WickSide,
}

impl PatternResult {
    pub const NO_RANGE: PatternResult = PatternResult {
        pattern: Pattern::None,
        wick_side: WickSide::NoRange,
    };
}

/// Time remaining until a timeframe's current bar closes, as of one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseCheck {
    pub timeframe: Timeframe,
    pub seconds_to_close: f64,
    pub closes_at: DateTime<Utc>,
}

/// A recognised pattern on a forming bar close to its boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub timeframe: String,
    pub pattern: Pattern,
    pub wick_side: WickSide,
    /// Last traded price used as the bar's close.
    pub price: f64,
    pub closes_at: DateTime<Utc>,
    /// Exchange server time when the bar was sampled.
    pub observed_at: DateTime<Utc>,
}

/// Work item for the notification dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Alert(Alert),
    UpcomingClose(CloseCheck),
    Text(String),
}

/// Where notifications end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    Telegram,
    Log,
}

impl std::fmt::Display for NotifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyMode::Telegram => write!(f, "telegram"),
            NotifyMode::Log => write!(f, "log"),
        }
    }
}
