//! Volatility and risk/reward calculation
//!
//! ATR-based stop/target envelopes and the risk/reward ratio used by the
//! filter chain. Stops and targets must always be computable: on unusable
//! volatility data the envelope degrades to a fixed-percentage band around
//! price instead of propagating an error.

use analyst_types::{Candle, KeyLevels, TimeframeProfile};

/// Tiny positive floor that keeps risk/reward division away from zero.
const EPSILON: f64 = 1e-9;

/// Fixed-percentage fallback envelope: +/-0.5% stops, +/-1% targets.
const FALLBACK_STOP_PCT: f64 = 0.005;
const FALLBACK_TARGET_PCT: f64 = 0.01;

/// Risk/reward ratios above this are treated as numerically absurd.
const MAX_RISK_REWARD: f64 = 50.0;

/// Volatility-scaled stop/target envelope plus the risk/reward ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskEnvelope {
    pub stop_buy: f64,
    pub stop_sell: f64,
    pub target_buy: f64,
    pub target_sell: f64,
    pub atr: f64,
    pub risk_reward_ratio: f64,
}

/// Mean true range over the most recent `period` steps.
///
/// True range per step is `max(high-low, |high - prev_close|, |low -
/// prev_close|)`; the first step has no previous close and falls back to its
/// own high-low. Returns 0 when fewer than `period` samples exist — callers
/// must treat 0 as "unknown", not as zero volatility.
pub fn average_true_range(history: &[Candle], period: usize) -> f64 {
    if period == 0 || history.len() < period {
        return 0.0;
    }

    let start = history.len() - period;
    let mut sum = 0.0;
    for i in start..history.len() {
        let candle = &history[i];
        let tr = match i.checked_sub(1).and_then(|p| history.get(p)) {
            Some(prev) => {
                let hl = candle.high - candle.low;
                let hc = (candle.high - prev.close).abs();
                let lc = (candle.low - prev.close).abs();
                hl.max(hc).max(lc)
            }
            None => candle.high - candle.low,
        };
        sum += tr;
    }
    sum / period as f64
}

/// Risk/reward ratio for the current candle against the key levels.
///
/// Degenerate levels (`support >= resistance`) or unusable input return 0.
/// A close already outside the band returns `min_risk_reward * 1.5` — a
/// fixed breakout bonus standing in for a measured ratio (documented
/// approximation). The result is capped at 50.
pub fn risk_reward(
    candle: &Candle,
    levels: &KeyLevels,
    profile: &TimeframeProfile,
    history: &[Candle],
) -> f64 {
    if !candle.is_finite() || !levels.is_finite() || !levels.is_ordered() {
        return 0.0;
    }

    let atr = average_true_range(history, profile.atr_period)
        .max(candle.range())
        .max(EPSILON);

    if candle.close < levels.support || candle.close > levels.resistance {
        return profile.min_risk_reward * 1.5;
    }

    let midpoint = (levels.support + levels.resistance) / 2.0;
    let (risk, reward) = if candle.close <= midpoint {
        // Long side: stop below support or the candle low, target past
        // resistance.
        let stop = (levels.support - atr * 0.5).min(candle.low - atr * 0.3);
        let target = levels.resistance + atr * profile.atr_multiplier;
        ((candle.close - stop).max(EPSILON), (target - candle.close).max(EPSILON))
    } else {
        let stop = (levels.resistance + atr * 0.5).max(candle.high + atr * 0.3);
        let target = levels.support - atr * profile.atr_multiplier;
        ((stop - candle.close).max(EPSILON), (candle.close - target).max(EPSILON))
    };

    (reward / risk).min(MAX_RISK_REWARD)
}

/// ATR-scaled stop/target envelope for both trade directions.
///
/// Falls back to the fixed-percentage band when no usable volatility
/// estimate exists; the envelope is always computable.
pub fn dynamic_stop(
    candle: &Candle,
    history: &[Candle],
    profile: &TimeframeProfile,
) -> RiskEnvelope {
    let mut atr = average_true_range(history, profile.atr_period);
    if !atr.is_finite() || atr <= 0.0 {
        atr = candle.range();
    }

    if !candle.is_finite() || !atr.is_finite() || atr <= 0.0 {
        let close = if candle.close.is_finite() {
            candle.close
        } else {
            0.0
        };
        return RiskEnvelope {
            stop_buy: close * (1.0 - FALLBACK_STOP_PCT),
            stop_sell: close * (1.0 + FALLBACK_STOP_PCT),
            target_buy: close * (1.0 + FALLBACK_TARGET_PCT),
            target_sell: close * (1.0 - FALLBACK_TARGET_PCT),
            atr: 0.0,
            risk_reward_ratio: 0.0,
        };
    }

    let step = atr * profile.atr_multiplier;
    RiskEnvelope {
        stop_buy: candle.low - step,
        stop_sell: candle.high + step,
        target_buy: candle.close + step * 2.0,
        target_sell: candle.close - step * 2.0,
        atr,
        risk_reward_ratio: 0.0,
    }
}

/// Full risk assessment: envelope plus ratio, in one pass.
pub fn assess(
    candle: &Candle,
    history: &[Candle],
    levels: &KeyLevels,
    profile: &TimeframeProfile,
) -> RiskEnvelope {
    let mut envelope = dynamic_stop(candle, history, profile);
    envelope.risk_reward_ratio = risk_reward(candle, levels, profile, history);
    envelope
}
