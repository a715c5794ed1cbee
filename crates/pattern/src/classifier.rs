use common::{DetectionSettings, Pattern, PatternResult, WickSide};

/// Bodies up to this share of the range are doji-like.
const DOJI_BODY_MAX: f64 = 0.05;
/// Bodies up to this share of the range can form hammers, stars and pin bars.
const SMALL_BODY_MAX: f64 = 0.2;

const DOJI_LONG_WICK: f64 = 0.8;
const DOJI_NO_WICK: f64 = 0.05;
const LONG_LEGGED_WICK: f64 = 0.4;
const SPINNING_TOP_WICK: f64 = 0.3;
const HIGH_WAVE_WICK: f64 = 0.2;
const PIN_BAR_SHORT_WICK: f64 = 0.1;
const HAMMER_WICK: f64 = 0.6;
/// Wicks closer than this share of the range count as equal.
const EQUAL_WICK_TOLERANCE: f64 = 0.1;

/// Single-bar candlestick classifier.
///
/// Works on the forming bar's open/high/low with the live price standing in
/// for the close. Pure and cheap; share it freely between tasks.
#[derive(Debug, Clone, Copy)]
pub struct PatternClassifier {
    pub wick_threshold: f64,
}

impl PatternClassifier {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            wick_threshold: settings.wick_threshold,
        }
    }

    pub fn classify(&self, open: f64, high: f64, low: f64, last: f64) -> PatternResult {
        classify(open, high, low, last, self.wick_threshold)
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(&DetectionSettings::default())
    }
}

/// Classify a bar into a wick side and a named pattern.
///
/// A range that is not positive and finite (flat bar, `high < low`, NaN)
/// yields `(None, No Range)`. A `last` outside `[low, high]` is not clamped;
/// its wick on that side simply floors at zero.
pub fn classify(open: f64, high: f64, low: f64, last: f64, wick_threshold: f64) -> PatternResult {
    let total_range = high - low;
    if !(total_range > 0.0) || !total_range.is_finite() {
        return PatternResult::NO_RANGE;
    }

    let g = Geometry::new(open, high, low, last, total_range);
    PatternResult {
        pattern: pattern(&g, open, last, wick_threshold),
        wick_side: wick_side(&g, wick_threshold),
    }
}

struct Geometry {
    body: f64,
    upper_wick: f64,
    lower_wick: f64,
    total_range: f64,
    body_pct: f64,
    upper_pct: f64,
    lower_pct: f64,
}

impl Geometry {
    fn new(open: f64, high: f64, low: f64, last: f64, total_range: f64) -> Self {
        let body = (last - open).abs();
        let upper_wick = (high - open.max(last)).max(0.0);
        let lower_wick = (open.min(last) - low).max(0.0);
        Self {
            body,
            upper_wick,
            lower_wick,
            total_range,
            body_pct: body / total_range,
            upper_pct: upper_wick / total_range,
            lower_pct: lower_wick / total_range,
        }
    }

    fn wicks_equal(&self) -> bool {
        (self.upper_wick - self.lower_wick).abs() < EQUAL_WICK_TOLERANCE * self.total_range
    }
}

fn wick_side(g: &Geometry, wick_threshold: f64) -> WickSide {
    if g.lower_wick > g.upper_wick && g.lower_wick >= wick_threshold * g.body {
        WickSide::LongerLowerWick
    } else if g.upper_wick > g.lower_wick && g.upper_wick >= wick_threshold * g.body {
        WickSide::LongerUpperWick
    } else if g.upper_wick > 0.0 && g.lower_wick > 0.0 && g.wicks_equal() {
        WickSide::EqualWicks
    } else {
        WickSide::NoSignificantWick
    }
}

// First match wins inside each tier.
fn pattern(g: &Geometry, open: f64, last: f64, wick_threshold: f64) -> Pattern {
    if g.body_pct <= DOJI_BODY_MAX {
        doji_family(g)
    } else if g.body_pct <= SMALL_BODY_MAX {
        small_body_family(g, open, last, wick_threshold)
    } else {
        Pattern::None
    }
}

fn doji_family(g: &Geometry) -> Pattern {
    let both_at_least = |share: f64| g.upper_pct >= share && g.lower_pct >= share;

    if g.upper_pct >= DOJI_LONG_WICK && g.lower_pct < DOJI_NO_WICK {
        Pattern::GravestoneDoji
    } else if g.lower_pct >= DOJI_LONG_WICK && g.upper_pct < DOJI_NO_WICK {
        Pattern::DragonflyDoji
    } else if both_at_least(LONG_LEGGED_WICK) && g.wicks_equal() {
        Pattern::RickshawMan
    } else if both_at_least(LONG_LEGGED_WICK) {
        Pattern::LongLeggedDoji
    } else if both_at_least(SPINNING_TOP_WICK) {
        Pattern::SpinningTop
    } else if both_at_least(HIGH_WAVE_WICK) {
        Pattern::HighWaveCandle
    } else {
        Pattern::Doji
    }
}

fn small_body_family(g: &Geometry, open: f64, last: f64, wick_threshold: f64) -> Pattern {
    let long_wick = wick_threshold * g.body;

    if g.upper_wick >= long_wick && g.lower_pct < PIN_BAR_SHORT_WICK {
        Pattern::PinBar
    } else if g.lower_wick >= long_wick && g.upper_pct < PIN_BAR_SHORT_WICK {
        Pattern::PinBar
    } else if g.lower_pct >= HAMMER_WICK {
        if last > open {
            Pattern::Hammer
        } else {
            Pattern::HangingMan
        }
    } else if g.upper_pct >= HAMMER_WICK {
        if last < open {
            Pattern::ShootingStar
        } else {
            Pattern::InvertedHammer
        }
    } else {
        Pattern::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(open: f64, high: f64, low: f64, last: f64) -> (Pattern, WickSide) {
        let r = PatternClassifier::default().classify(open, high, low, last);
        (r.pattern, r.wick_side)
    }

    #[test]
    fn flat_bar_has_no_range() {
        assert_eq!(
            PatternClassifier::default().classify(100.0, 100.0, 100.0, 100.0),
            PatternResult::NO_RANGE
        );
    }

    #[test]
    fn inverted_high_low_has_no_range() {
        assert_eq!(check(100.0, 99.0, 101.0, 100.0), (Pattern::None, WickSide::NoRange));
    }

    #[test]
    fn nan_range_has_no_range() {
        assert_eq!(check(100.0, f64::NAN, 99.0, 100.0), (Pattern::None, WickSide::NoRange));
    }

    #[test]
    fn dragonfly_doji_scenario() {
        assert_eq!(
            check(100.0, 101.0, 90.0, 100.5),
            (Pattern::DragonflyDoji, WickSide::LongerLowerWick)
        );
    }

    #[test]
    fn long_upper_wick_with_nine_percent_lower_wick_is_plain_doji() {
        // lower wick 1 / range 11 is ~0.09, too long for a gravestone and too
        // short for any two-wick doji.
        assert_eq!(
            check(100.0, 110.0, 99.0, 100.2),
            (Pattern::Doji, WickSide::LongerUpperWick)
        );
    }

    #[test]
    fn gravestone_doji() {
        assert_eq!(
            check(100.0, 110.0, 99.8, 100.1),
            (Pattern::GravestoneDoji, WickSide::LongerUpperWick)
        );
    }

    #[test]
    fn rickshaw_man_needs_balanced_long_wicks() {
        assert_eq!(
            check(100.0, 105.0, 95.0, 100.1),
            (Pattern::RickshawMan, WickSide::LongerLowerWick)
        );
    }

    #[test]
    fn long_legged_doji_when_long_wicks_differ() {
        assert_eq!(
            check(1000.0, 1044.0, 944.0, 1002.0),
            (Pattern::LongLeggedDoji, WickSide::LongerLowerWick)
        );
    }

    #[test]
    fn spinning_top() {
        assert_eq!(check(1000.0, 1037.0, 937.0, 1002.0).0, Pattern::SpinningTop);
    }

    #[test]
    fn high_wave_candle() {
        assert_eq!(check(1000.0, 1027.0, 927.0, 1002.0).0, Pattern::HighWaveCandle);
    }

    #[test]
    fn short_upper_wick_falls_back_to_doji() {
        assert_eq!(check(1000.0, 1012.0, 914.0, 1002.0).0, Pattern::Doji);
    }

    #[test]
    fn pin_bar_with_long_upper_wick() {
        assert_eq!(
            check(1000.0, 1080.0, 985.0, 990.0),
            (Pattern::PinBar, WickSide::LongerUpperWick)
        );
    }

    #[test]
    fn pin_bar_with_long_lower_wick() {
        assert_eq!(
            check(1000.0, 1015.0, 920.0, 1010.0),
            (Pattern::PinBar, WickSide::LongerLowerWick)
        );
    }

    #[test]
    fn hammer_and_hanging_man_split_on_direction() {
        assert_eq!(
            check(1000.0, 1030.0, 930.0, 1015.0),
            (Pattern::Hammer, WickSide::LongerLowerWick)
        );
        assert_eq!(check(1015.0, 1030.0, 930.0, 1000.0).0, Pattern::HangingMan);
    }

    #[test]
    fn shooting_star_and_inverted_hammer_split_on_direction() {
        assert_eq!(
            check(1015.0, 1085.0, 985.0, 1000.0),
            (Pattern::ShootingStar, WickSide::LongerUpperWick)
        );
        assert_eq!(check(1000.0, 1085.0, 985.0, 1015.0).0, Pattern::InvertedHammer);
    }

    #[test]
    fn small_body_without_dominant_shape_is_none() {
        assert_eq!(
            check(1000.0, 1050.0, 950.0, 1015.0),
            (Pattern::None, WickSide::LongerLowerWick)
        );
    }

    #[test]
    fn large_body_is_never_a_pattern() {
        assert_eq!(
            check(1000.0, 1080.0, 980.0, 1060.0),
            (Pattern::None, WickSide::EqualWicks)
        );
        assert_eq!(
            check(1000.0, 1100.0, 1000.0, 1100.0),
            (Pattern::None, WickSide::NoSignificantWick)
        );
    }

    #[test]
    fn last_outside_range_passes_through() {
        assert_eq!(
            check(100.0, 100.5, 100.4, 99.9),
            (Pattern::None, WickSide::LongerUpperWick)
        );
    }

    #[test]
    fn wick_threshold_is_configurable() {
        // lower wick 80 vs body 10: dominant at 2x, not at 10x.
        let strict = PatternClassifier::new(&DetectionSettings { wick_threshold: 10.0 });
        let r = strict.classify(1000.0, 1015.0, 920.0, 1010.0);
        assert_ne!(r.pattern, Pattern::PinBar);
        assert_eq!(r.wick_side, WickSide::NoSignificantWick);
    }
}
