//! Timeframe identifiers and per-timeframe threshold profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis horizon. M5 is the short scalping timeframe, H1 the medium
/// intraday one, D1 the long daily one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M5,
    H1,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::M5, Timeframe::H1, Timeframe::D1];

    /// Session-window filtering only applies to the short timeframe.
    pub fn is_short(&self) -> bool {
        matches!(self, Timeframe::M5)
    }
}

impl FromStr for Timeframe {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m5" | "5m" | "5min" => Ok(Timeframe::M5),
            "h1" | "1h" | "60m" => Ok(Timeframe::H1),
            "d1" | "1d" | "daily" => Ok(Timeframe::D1),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::M5 => write!(f, "M5"),
            Timeframe::H1 => write!(f, "H1"),
            Timeframe::D1 => write!(f, "D1"),
        }
    }
}

/// Every tunable threshold for one timeframe.
///
/// This is the single source of numbers for the detector, the risk
/// calculator and the filter chain; none of them embed their own constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeProfile {
    /// Fast/slow moving-average periods (rendered into the oracle prompt).
    pub ma_fast_period: usize,
    pub ma_slow_period: usize,

    /// Oscillator bands.
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,

    /// Deep oscillator extremes for the volume-confirmed override.
    pub rsi_deep_overbought: f64,
    pub rsi_deep_oversold: f64,

    /// Volume must exceed `avg_volume * volume_spike_mult` to confirm a
    /// breakout, and `avg_volume * volume_confirm_mult` to validate an
    /// extreme oscillator reading.
    pub volume_spike_mult: f64,
    pub volume_confirm_mult: f64,

    /// Minimum acceptable risk/reward ratio.
    pub min_risk_reward: f64,

    /// Candle-shape thresholds, all as fractions of the candle range.
    pub pin_wick_ratio: f64,
    pub min_body_ratio: f64,

    /// A strong candle closes beyond its open by more than
    /// `average_range * min_size_ratio`.
    pub min_size_ratio: f64,

    /// A candle narrower than `average_range * max_noise_ratio` is noise.
    pub max_noise_ratio: f64,

    /// ATR lookback and stop/target multiplier.
    pub atr_period: usize,
    pub atr_multiplier: f64,

    /// Minimum candle history length required for this timeframe.
    pub min_history: usize,
}

impl TimeframeProfile {
    /// Default thresholds per timeframe. Overridable from the service
    /// configuration file.
    pub fn default_for(timeframe: Timeframe) -> Self {
        match timeframe {
            Timeframe::M5 => Self {
                ma_fast_period: 9,
                ma_slow_period: 21,
                rsi_overbought: 70.0,
                rsi_oversold: 30.0,
                rsi_deep_overbought: 80.0,
                rsi_deep_oversold: 20.0,
                volume_spike_mult: 1.5,
                volume_confirm_mult: 1.2,
                min_risk_reward: 1.5,
                pin_wick_ratio: 0.6,
                min_body_ratio: 0.3,
                min_size_ratio: 0.5,
                max_noise_ratio: 0.3,
                atr_period: 14,
                atr_multiplier: 1.5,
                min_history: 20,
            },
            Timeframe::H1 => Self {
                ma_fast_period: 21,
                ma_slow_period: 50,
                rsi_overbought: 70.0,
                rsi_oversold: 30.0,
                rsi_deep_overbought: 80.0,
                rsi_deep_oversold: 20.0,
                volume_spike_mult: 1.5,
                volume_confirm_mult: 1.2,
                min_risk_reward: 1.8,
                pin_wick_ratio: 0.6,
                min_body_ratio: 0.3,
                min_size_ratio: 0.6,
                max_noise_ratio: 0.25,
                atr_period: 14,
                atr_multiplier: 2.0,
                min_history: 30,
            },
            Timeframe::D1 => Self {
                ma_fast_period: 50,
                ma_slow_period: 200,
                rsi_overbought: 75.0,
                rsi_oversold: 25.0,
                rsi_deep_overbought: 85.0,
                rsi_deep_oversold: 15.0,
                volume_spike_mult: 1.4,
                volume_confirm_mult: 1.2,
                min_risk_reward: 2.0,
                pin_wick_ratio: 0.55,
                min_body_ratio: 0.35,
                min_size_ratio: 0.7,
                max_noise_ratio: 0.2,
                atr_period: 14,
                atr_multiplier: 2.5,
                min_history: 50,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("5m".parse::<Timeframe>(), Ok(Timeframe::M5));
        assert_eq!("M5".parse::<Timeframe>(), Ok(Timeframe::M5));
        assert_eq!("1h".parse::<Timeframe>(), Ok(Timeframe::H1));
        assert_eq!("daily".parse::<Timeframe>(), Ok(Timeframe::D1));
        assert!("w1".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_only_m5_is_short() {
        assert!(Timeframe::M5.is_short());
        assert!(!Timeframe::H1.is_short());
        assert!(!Timeframe::D1.is_short());
    }

    #[test]
    fn test_default_profiles() {
        for timeframe in Timeframe::ALL {
            let profile = TimeframeProfile::default_for(timeframe);

            assert!(profile.ma_fast_period < profile.ma_slow_period);
            assert!(profile.rsi_oversold < profile.rsi_overbought);
            assert!(profile.rsi_deep_oversold < profile.rsi_oversold);
            assert!(profile.rsi_deep_overbought > profile.rsi_overbought);
            assert!(profile.min_risk_reward >= 1.5);
            assert!(profile.min_history >= 20);
        }
    }

    #[test]
    fn test_longer_horizons_demand_more() {
        let m5 = TimeframeProfile::default_for(Timeframe::M5);
        let d1 = TimeframeProfile::default_for(Timeframe::D1);

        assert!(d1.min_risk_reward > m5.min_risk_reward);
        assert!(d1.min_history > m5.min_history);
    }
}
