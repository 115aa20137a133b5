//! Market data validation
//!
//! Total, synchronous structural checks over the inbound snapshot. Runs
//! before any derived computation; every downstream component assumes these
//! preconditions hold. Each failure names the offending wire field.

use crate::error::{AnalystError, Result};
use analyst_types::{AnalysisRequest, Timeframe, TimeframeProfile, TrendBias};

/// Parse the wire timeframe identifier.
pub fn resolve_timeframe(raw: &str) -> Result<Timeframe> {
    raw.parse().map_err(|_| {
        AnalystError::validation("timeframe", format!("unknown timeframe '{}'", raw))
    })
}

/// Validate the full market snapshot against the resolved profile.
///
/// Returns nothing on success. Has no side effects.
pub fn validate(request: &AnalysisRequest, profile: &TimeframeProfile) -> Result<()> {
    if request.symbol.trim().is_empty() {
        return Err(AnalystError::validation("symbol", "must not be empty"));
    }

    let candle = request
        .ohlc
        .as_ref()
        .ok_or_else(|| AnalystError::validation("ohlc", "missing OHLC data"))?;

    for (field, value) in [
        ("ohlc.open", candle.open),
        ("ohlc.high", candle.high),
        ("ohlc.low", candle.low),
        ("ohlc.close", candle.close),
    ] {
        if !value.is_finite() {
            return Err(AnalystError::validation(field, "missing or non-numeric"));
        }
    }

    if candle.high < candle.low {
        return Err(AnalystError::validation(
            "ohlc.high",
            "high price cannot be lower than low price",
        ));
    }
    if candle.open < candle.low || candle.open > candle.high {
        return Err(AnalystError::validation(
            "ohlc.open",
            "outside the candle's high/low range",
        ));
    }
    if candle.close < candle.low || candle.close > candle.high {
        return Err(AnalystError::validation(
            "ohlc.close",
            "outside the candle's high/low range",
        ));
    }

    if request.prev_candles.len() < profile.min_history {
        return Err(AnalystError::validation(
            "prevCandles",
            format!(
                "insufficient history: need at least {} candles, got {}",
                profile.min_history,
                request.prev_candles.len()
            ),
        ));
    }
    for (index, prev) in request.prev_candles.iter().enumerate() {
        if !prev.is_finite() {
            return Err(AnalystError::validation(
                "prevCandles",
                format!("candle {} has missing or non-numeric fields", index),
            ));
        }
    }

    for (field, value) in [
        ("indicators.rsi", request.indicators.rsi),
        ("indicators.macd", request.indicators.macd),
        ("indicators.macd_signal", request.indicators.macd_signal),
        ("indicators.ema_fast", request.indicators.ema_fast),
        ("indicators.ema_slow", request.indicators.ema_slow),
    ] {
        match value {
            Some(v) if v.is_finite() => {}
            Some(_) => return Err(AnalystError::validation(field, "non-numeric")),
            None => return Err(AnalystError::validation(field, "missing required indicator")),
        }
    }

    let higher = request
        .higher_tf
        .as_ref()
        .ok_or_else(|| AnalystError::validation("higherTF", "missing higher timeframe trends"))?;
    for (field, label) in [
        ("higherTF.h1Trend", higher.h1_trend.as_str()),
        ("higherTF.d1Trend", higher.d1_trend.as_str()),
    ] {
        if label.parse::<TrendBias>().is_err() {
            return Err(AnalystError::validation(
                field,
                format!("unknown trend label '{}'", label),
            ));
        }
    }

    if !request.volume.is_finite() || request.volume <= 0.0 {
        return Err(AnalystError::validation(
            "volume",
            "must be a positive number",
        ));
    }
    if !request.avg_volume.is_finite() || request.avg_volume <= 0.0 {
        return Err(AnalystError::validation(
            "avgVolume",
            "must be a positive number",
        ));
    }

    let levels = request
        .key_levels
        .as_ref()
        .ok_or_else(|| AnalystError::validation("keyLevels", "missing key levels"))?;
    if !levels.is_finite() {
        return Err(AnalystError::validation(
            "keyLevels",
            "support and resistance must be numbers",
        ));
    }

    Ok(())
}
