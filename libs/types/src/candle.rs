//! OHLC candle representation and geometry helpers

use serde::{Deserialize, Serialize};

fn nan() -> f64 {
    f64::NAN
}

/// A single OHLC candle. Immutable once observed.
///
/// Well-formed candles satisfy `low <= min(open, close)` and
/// `max(open, close) <= high`; the validator enforces this at the service
/// boundary, so downstream math may assume it. Fields missing on the wire
/// deserialize to NaN and are rejected by the validator by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(default = "nan")]
    pub open: f64,
    #[serde(default = "nan")]
    pub high: f64,
    #[serde(default = "nan")]
    pub low: f64,
    #[serde(default = "nan")]
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Absolute distance between open and close.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Wick above the body.
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body.
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Full high-to-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// True when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

/// Mean high-to-low range over a candle history. Returns 0 for an empty
/// history; callers treat 0 as "unknown", not as zero volatility.
pub fn average_range(history: &[Candle]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let sum: f64 = history.iter().map(Candle::range).sum();
    sum / history.len() as f64
}
