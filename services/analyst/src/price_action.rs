//! Price action pattern detection
//!
//! Pure classification of the current candle against its recent history and
//! the key levels. This is a diagnostic subsystem, not a gate: unexpected
//! input yields a safe all-false/noise report, never an error.

use analyst_types::{average_range, Candle, KeyLevels, TimeframeProfile};

/// A candle whose body is under this fraction of its range is a doji.
const DOJI_BODY_RATIO: f64 = 0.1;

/// Price-action classification, computed once per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceActionReport {
    pub is_bullish_pin: bool,
    pub is_bearish_pin: bool,
    pub rejection_at_resistance: bool,
    pub rejection_at_support: bool,
    pub strong_bullish: bool,
    pub strong_bearish: bool,
    pub is_noise: bool,
    pub is_doji: bool,
    pub breakout_above_resistance: bool,
    pub breakout_below_support: bool,
    pub strong_breakout: bool,
}

impl PriceActionReport {
    /// Report for a degenerate candle (zero range) or unusable input.
    fn degenerate() -> Self {
        Self {
            is_noise: true,
            is_doji: true,
            ..Default::default()
        }
    }

    /// Names of the detected patterns, for response metadata and logging.
    pub fn patterns(&self) -> Vec<String> {
        let mut names = Vec::new();
        let flags = [
            (self.is_bullish_pin, "bullish_pin"),
            (self.is_bearish_pin, "bearish_pin"),
            (self.rejection_at_resistance, "rejection_at_resistance"),
            (self.rejection_at_support, "rejection_at_support"),
            (self.strong_bullish, "strong_bullish"),
            (self.strong_bearish, "strong_bearish"),
            (self.is_noise, "noise"),
            (self.is_doji, "doji"),
            (self.breakout_above_resistance, "breakout_above_resistance"),
            (self.breakout_below_support, "breakout_below_support"),
            (self.strong_breakout, "strong_breakout"),
        ];
        for (set, name) in flags {
            if set {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Classify a candle. All thresholds come from the resolved profile.
pub fn detect(
    candle: &Candle,
    history: &[Candle],
    levels: &KeyLevels,
    profile: &TimeframeProfile,
) -> PriceActionReport {
    if !candle.is_finite() || !levels.is_finite() {
        return PriceActionReport::degenerate();
    }

    let body = candle.body();
    let upper_wick = candle.upper_wick();
    let lower_wick = candle.lower_wick();
    let total_range = candle.range();

    if total_range <= 0.0 {
        return PriceActionReport::degenerate();
    }

    let avg_range = average_range(history);

    let is_bullish_pin = lower_wick / total_range > profile.pin_wick_ratio
        && body / total_range < profile.min_body_ratio;
    let is_bearish_pin = upper_wick / total_range > profile.pin_wick_ratio
        && body / total_range < profile.min_body_ratio;

    let rejection_at_resistance = candle.high > levels.resistance && candle.close < levels.resistance;
    let rejection_at_support = candle.low < levels.support && candle.close > levels.support;

    let strong_bullish =
        candle.is_bullish() && (candle.close - candle.open) > avg_range * profile.min_size_ratio;
    let strong_bearish =
        candle.is_bearish() && (candle.open - candle.close) > avg_range * profile.min_size_ratio;

    let is_noise = total_range < avg_range * profile.max_noise_ratio;
    let is_doji = body / total_range < DOJI_BODY_RATIO;

    // Directional breakout: the close is past a level the same candle opened
    // on the near side of. "Strong" additionally requires the opposite wick
    // to be shorter than the penetration depth.
    let breakout_above_resistance =
        candle.close > levels.resistance && candle.open <= levels.resistance;
    let breakout_below_support = candle.close < levels.support && candle.open >= levels.support;

    let strong_breakout = (breakout_above_resistance
        && lower_wick < candle.close - levels.resistance)
        || (breakout_below_support && upper_wick < levels.support - candle.close);

    PriceActionReport {
        is_bullish_pin,
        is_bearish_pin,
        rejection_at_resistance,
        rejection_at_support,
        strong_bullish,
        strong_bearish,
        is_noise,
        is_doji,
        breakout_above_resistance,
        breakout_below_support,
        strong_breakout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_types::{Timeframe, TimeframeProfile};

    fn profile() -> TimeframeProfile {
        TimeframeProfile::default_for(Timeframe::M5)
    }

    fn levels(support: f64, resistance: f64) -> KeyLevels {
        KeyLevels {
            support,
            resistance,
        }
    }

    fn flat_history(range: f64, count: usize) -> Vec<Candle> {
        (0..count)
            .map(|_| Candle::new(1.05, 1.05 + range, 1.05, 1.05 + range / 2.0))
            .collect()
    }

    #[test]
    fn test_zero_range_candle_is_noise_and_doji() {
        let candle = Candle::new(1.08, 1.08, 1.08, 1.08);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.05, 1.10), &profile());

        assert!(report.is_noise);
        assert!(report.is_doji);
        assert!(!report.is_bullish_pin);
        assert!(!report.breakout_above_resistance);
    }

    #[test]
    fn test_bullish_pin_bar() {
        // Long lower wick, small body near the top.
        let candle = Candle::new(1.095, 1.10, 1.00, 1.10);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(0.90, 1.20), &profile());

        assert!(report.is_bullish_pin);
        assert!(!report.is_bearish_pin);
    }

    #[test]
    fn test_bearish_pin_bar() {
        let candle = Candle::new(1.005, 1.10, 1.00, 1.00);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(0.90, 1.20), &profile());

        assert!(report.is_bearish_pin);
        assert!(!report.is_bullish_pin);
    }

    #[test]
    fn test_rejection_at_resistance() {
        // High pierces 1.08, close falls back under it.
        let candle = Candle::new(1.02, 1.10, 1.00, 1.079);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(0.95, 1.08), &profile());

        assert!(report.rejection_at_resistance);
        assert!(!report.rejection_at_support);
    }

    #[test]
    fn test_rejection_at_support() {
        let candle = Candle::new(1.06, 1.07, 1.00, 1.055);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.05, 1.10), &profile());

        assert!(report.rejection_at_support);
    }

    #[test]
    fn test_strong_bullish_candle() {
        // Body 0.02 against an average range of 0.01 clears 0.01 * 0.5.
        let candle = Candle::new(1.05, 1.071, 1.049, 1.07);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.00, 1.20), &profile());

        assert!(report.strong_bullish);
        assert!(!report.strong_bearish);
    }

    #[test]
    fn test_noise_candle() {
        // Range 0.002 against an average range of 0.01 is under the 0.3 ratio.
        let candle = Candle::new(1.05, 1.052, 1.05, 1.051);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.00, 1.20), &profile());

        assert!(report.is_noise);
    }

    #[test]
    fn test_breakout_above_resistance() {
        // Opened below resistance, closed above it with a short lower wick.
        let candle = Candle::new(1.079, 1.095, 1.078, 1.09);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.05, 1.08), &profile());

        assert!(report.breakout_above_resistance);
        assert!(report.strong_breakout);
        assert!(!report.breakout_below_support);
    }

    #[test]
    fn test_weak_poke_is_not_a_strong_breakout() {
        // Closes just past resistance with a deep lower wick: a poke, not
        // conviction.
        let candle = Candle::new(1.079, 1.082, 1.04, 1.081);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.00, 1.08), &profile());

        assert!(report.breakout_above_resistance);
        assert!(!report.strong_breakout);
    }

    #[test]
    fn test_breakout_below_support() {
        let candle = Candle::new(1.051, 1.052, 1.035, 1.04);
        let report = detect(&candle, &flat_history(0.01, 20), &levels(1.05, 1.10), &profile());

        assert!(report.breakout_below_support);
        assert!(report.strong_breakout);
    }

    #[test]
    fn test_unusable_input_yields_safe_report() {
        let candle = Candle::new(f64::NAN, 1.1, 1.0, 1.05);
        let report = detect(&candle, &[], &levels(1.0, 1.1), &profile());

        assert_eq!(report, PriceActionReport::degenerate());
    }

    #[test]
    fn test_every_field_is_defined_for_arbitrary_candles() {
        // No panics, no poisoned values, for a spread of candle shapes.
        let candles = [
            Candle::new(1.0, 1.0, 1.0, 1.0),
            Candle::new(1.0, 2.0, 0.5, 1.5),
            Candle::new(2.0, 2.0, 1.0, 1.0),
            Candle::new(1.0, 1.000001, 0.999999, 1.0),
        ];
        for candle in candles {
            let report = detect(&candle, &flat_history(0.01, 5), &levels(0.9, 1.6), &profile());
            if candle.range() <= 0.0 {
                assert!(report.is_noise);
            }
            let _ = report.patterns();
        }
    }
}
