//! Market snapshot types: indicators, key levels, higher-timeframe context
//! and the wire request/response pair.
//!
//! Wire structs mirror the inbound JSON field names (`prevCandles`,
//! `keyLevels`, `higherTF`, ...). Numeric fields that may be absent default
//! to NaN so the validator can reject them by name instead of failing the
//! whole deserialization with an opaque message.

use crate::candle::Candle;
use crate::signal::Signal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) fn nan() -> f64 {
    f64::NAN
}

/// Technical indicator snapshot supplied by the caller.
///
/// All fields are optional on the wire; [`Indicators::rsi`] and friends are
/// the post-validation accessors with the documented coercion rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Indicators {
    /// Oscillator value, bounded [0, 100]. Out-of-range readings are
    /// clamped, not rejected; the neutral fallback is 50.
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    /// Fast/slow moving averages (EMA9/EMA21 on the short timeframe).
    #[serde(alias = "ema9")]
    pub ema_fast: Option<f64>,
    #[serde(alias = "ema21")]
    pub ema_slow: Option<f64>,
}

impl Indicators {
    /// Clamped, finite oscillator value; 50 (neutral) when unusable.
    pub fn rsi(&self) -> f64 {
        match self.rsi {
            Some(v) if v.is_finite() => v.clamp(0.0, 100.0),
            _ => 50.0,
        }
    }

    pub fn macd(&self) -> f64 {
        coerce(self.macd)
    }

    pub fn macd_signal(&self) -> f64 {
        coerce(self.macd_signal)
    }

    pub fn ema_fast(&self) -> f64 {
        coerce(self.ema_fast)
    }

    pub fn ema_slow(&self) -> f64 {
        coerce(self.ema_slow)
    }
}

fn coerce(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Support and resistance bounds for the traded range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyLevels {
    #[serde(alias = "s1", default = "nan")]
    pub support: f64,
    #[serde(alias = "r1", default = "nan")]
    pub resistance: f64,
}

impl KeyLevels {
    pub fn is_finite(&self) -> bool {
        self.support.is_finite() && self.resistance.is_finite()
    }

    /// `support < resistance`. A violated invariant degrades risk/reward to
    /// zero downstream rather than failing the request.
    pub fn is_ordered(&self) -> bool {
        self.support < self.resistance
    }
}

/// Higher-timeframe directional bias label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendBias {
    StrongBearish,
    Bearish,
    Neutral,
    Bullish,
    StrongBullish,
}

impl TrendBias {
    pub fn is_bullish(&self) -> bool {
        matches!(self, TrendBias::Bullish | TrendBias::StrongBullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, TrendBias::Bearish | TrendBias::StrongBearish)
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, TrendBias::StrongBullish | TrendBias::StrongBearish)
    }
}

impl FromStr for TrendBias {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "strong bearish" => Ok(TrendBias::StrongBearish),
            "bearish" => Ok(TrendBias::Bearish),
            "neutral" | "sideways" | "ranging" => Ok(TrendBias::Neutral),
            "bullish" => Ok(TrendBias::Bullish),
            "strong bullish" => Ok(TrendBias::StrongBullish),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TrendBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendBias::StrongBearish => write!(f, "strong bearish"),
            TrendBias::Bearish => write!(f, "bearish"),
            TrendBias::Neutral => write!(f, "neutral"),
            TrendBias::Bullish => write!(f, "bullish"),
            TrendBias::StrongBullish => write!(f, "strong bullish"),
        }
    }
}

/// Raw higher-timeframe trend labels as received; the validator parses them
/// into [`TrendBias`] values once per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HigherTimeframes {
    #[serde(default)]
    pub h1_trend: String,
    #[serde(default)]
    pub d1_trend: String,
}

/// Macro-news impact bucket. Unknown labels map to medium so they neither
/// trigger nor suppress the news veto by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsImpact {
    Low,
    Medium,
    High,
}

impl<'de> Deserialize<'de> for NewsImpact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_ascii_lowercase().as_str() {
            "high" => NewsImpact::High,
            "low" => NewsImpact::Low,
            _ => NewsImpact::Medium,
        })
    }
}

/// A scheduled macro-news event from the caller's calendar feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsEvent {
    #[serde(default)]
    pub title: String,
    pub impact: NewsImpact,
    /// Currency code the event concerns, e.g. "USD".
    #[serde(default)]
    pub currency: String,
    /// Minutes until the event fires; negative once it has passed.
    #[serde(default)]
    pub minutes_until: i64,
}

impl NewsEvent {
    pub fn affects(&self, symbol: &str) -> bool {
        !self.currency.is_empty()
            && symbol
                .to_ascii_uppercase()
                .contains(&self.currency.to_ascii_uppercase())
    }

    pub fn is_within(&self, window_minutes: i64) -> bool {
        self.minutes_until.abs() <= window_minutes
    }
}

/// Optional market context: session override and scheduled news events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub news_events: Vec<NewsEvent>,
}

impl MarketContext {
    /// True when a high-impact event for the traded symbol sits inside the
    /// configured window around now.
    pub fn has_active_news(&self, symbol: &str, window_minutes: i64) -> bool {
        self.news_events.iter().any(|event| {
            event.impact == NewsImpact::High
                && event.affects(symbol)
                && event.is_within(window_minutes)
        })
    }
}

/// FX session label derived from the UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingSession {
    Sydney,
    Tokyo,
    London,
    NewYork,
    LondonNewYork,
}

impl TradingSession {
    /// Label a UTC hour. Overlapping windows resolve to the busiest label:
    /// the London/New York overlap wins over either alone.
    pub fn from_utc_hour(hour: u32) -> Self {
        match hour {
            12..=15 => TradingSession::LondonNewYork,
            7..=11 => TradingSession::London,
            16..=20 => TradingSession::NewYork,
            0..=6 => TradingSession::Tokyo,
            _ => TradingSession::Sydney,
        }
    }
}

impl FromStr for TradingSession {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '_', '/'], "");
        match normalized.as_str() {
            "sydney" => Ok(TradingSession::Sydney),
            "tokyo" | "asian" | "asia" => Ok(TradingSession::Tokyo),
            "london" | "european" => Ok(TradingSession::London),
            "newyork" | "us" => Ok(TradingSession::NewYork),
            "londonnewyork" | "overlap" => Ok(TradingSession::LondonNewYork),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TradingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingSession::Sydney => write!(f, "Sydney"),
            TradingSession::Tokyo => write!(f, "Tokyo"),
            TradingSession::London => write!(f, "London"),
            TradingSession::NewYork => write!(f, "New York"),
            TradingSession::LondonNewYork => write!(f, "London/New York"),
        }
    }
}

/// Inbound analysis request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub timeframe: String,
    pub ohlc: Option<Candle>,
    #[serde(default)]
    pub prev_candles: Vec<Candle>,
    #[serde(default)]
    pub indicators: Indicators,
    #[serde(default = "nan")]
    pub volume: f64,
    #[serde(default = "nan")]
    pub avg_volume: f64,
    pub key_levels: Option<KeyLevels>,
    #[serde(rename = "higherTF")]
    pub higher_tf: Option<HigherTimeframes>,
    #[serde(default)]
    pub market_context: Option<MarketContext>,
}

/// Derived metadata returned alongside the final signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub session: String,
    pub atr: f64,
    pub news_risk: bool,
    pub patterns: Vec<String>,
    pub risk_reward: f64,
}

/// Outbound analysis response: the final filtered signal plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub signal: Signal,
    pub meta: ResponseMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_coercion() {
        let indicators = Indicators {
            rsi: Some(130.0),
            ..Default::default()
        };
        assert_eq!(indicators.rsi(), 100.0);

        let missing = Indicators::default();
        assert_eq!(missing.rsi(), 50.0);

        let nan_rsi = Indicators {
            rsi: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(nan_rsi.rsi(), 50.0);
    }

    #[test]
    fn test_trend_bias_parsing() {
        assert_eq!("bullish".parse::<TrendBias>(), Ok(TrendBias::Bullish));
        assert_eq!(
            "strong bearish".parse::<TrendBias>(),
            Ok(TrendBias::StrongBearish)
        );
        assert_eq!(
            "STRONG_BULLISH".parse::<TrendBias>(),
            Ok(TrendBias::StrongBullish)
        );
        assert_eq!("sideways".parse::<TrendBias>(), Ok(TrendBias::Neutral));
        assert!("upward".parse::<TrendBias>().is_err());
    }

    #[test]
    fn test_key_level_ordering() {
        let ordered = KeyLevels {
            support: 1.05,
            resistance: 1.08,
        };
        assert!(ordered.is_ordered());

        let inverted = KeyLevels {
            support: 1.05,
            resistance: 1.04,
        };
        assert!(!inverted.is_ordered());
    }

    #[test]
    fn test_news_activation() {
        let context = MarketContext {
            session: None,
            news_events: vec![NewsEvent {
                title: "NFP".to_string(),
                impact: NewsImpact::High,
                currency: "USD".to_string(),
                minutes_until: 10,
            }],
        };

        assert!(context.has_active_news("EURUSD", 30));
        assert!(!context.has_active_news("EURGBP", 30));
        assert!(!context.has_active_news("EURUSD", 5));
    }

    #[test]
    fn test_medium_impact_never_activates() {
        let context = MarketContext {
            session: None,
            news_events: vec![NewsEvent {
                title: "PMI".to_string(),
                impact: NewsImpact::Medium,
                currency: "USD".to_string(),
                minutes_until: 0,
            }],
        };

        assert!(!context.has_active_news("EURUSD", 30));
    }

    #[test]
    fn test_session_labelling() {
        assert_eq!(TradingSession::from_utc_hour(3), TradingSession::Tokyo);
        assert_eq!(TradingSession::from_utc_hour(9), TradingSession::London);
        assert_eq!(
            TradingSession::from_utc_hour(14),
            TradingSession::LondonNewYork
        );
        assert_eq!(TradingSession::from_utc_hour(18), TradingSession::NewYork);
        assert_eq!(TradingSession::from_utc_hour(22), TradingSession::Sydney);
    }

    #[test]
    fn test_request_deserialization() {
        let body = serde_json::json!({
            "symbol": "EURUSD",
            "timeframe": "5m",
            "ohlc": {"open": 1.082, "high": 1.10, "low": 1.00, "close": 1.085},
            "prevCandles": [{"open": 1.07, "high": 1.09, "low": 1.06, "close": 1.08}],
            "indicators": {"rsi": 55.0, "macd": 0.002, "macd_signal": 0.001, "ema9": 1.081, "ema21": 1.078},
            "volume": 1200.0,
            "avgVolume": 1000.0,
            "keyLevels": {"s1": 1.05, "r1": 1.08},
            "higherTF": {"h1Trend": "bullish", "d1Trend": "neutral"}
        });

        let request: AnalysisRequest = serde_json::from_value(body).unwrap();

        assert_eq!(request.symbol, "EURUSD");
        assert_eq!(request.prev_candles.len(), 1);
        assert_eq!(request.indicators.ema_fast(), 1.081);
        let levels = request.key_levels.unwrap();
        assert_eq!(levels.support, 1.05);
        assert_eq!(levels.resistance, 1.08);
        assert_eq!(request.higher_tf.unwrap().h1_trend, "bullish");
        assert!(request.market_context.is_none());
    }

    #[test]
    fn test_missing_volume_defaults_to_nan() {
        let body = serde_json::json!({
            "symbol": "EURUSD",
            "timeframe": "5m",
            "ohlc": {"open": 1.0, "high": 1.1, "low": 0.9, "close": 1.05}
        });

        let request: AnalysisRequest = serde_json::from_value(body).unwrap();
        assert!(request.volume.is_nan());
        assert!(request.avg_volume.is_nan());
    }
}
