//! Signal filter chain
//!
//! Prioritized accept/reject/boost rules applied to the oracle's proposed
//! signal. The chain is an ordered list of rule objects evaluated by a
//! single fold: the first matching terminal rule ends the chain, boost
//! rules modify the signal and fall through. Later rules assume earlier
//! ones already excluded their triggering conditions, so the order in
//! [`default_chain`] is load-bearing.

use crate::price_action::PriceActionReport;
use crate::risk::RiskEnvelope;
use analyst_types::{
    Candle, Confidence, Direction, Indicators, Signal, Timeframe, TimeframeProfile,
    TradingSession, TrendBias,
};
use tracing::debug;

/// Everything a rule may consult besides the signal itself.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub timeframe: Timeframe,
    pub profile: &'a TimeframeProfile,
    pub candle: &'a Candle,
    pub indicators: &'a Indicators,
    pub volume: f64,
    pub avg_volume: f64,
    pub price_action: &'a PriceActionReport,
    pub envelope: &'a RiskEnvelope,
    pub h1_trend: TrendBias,
    pub d1_trend: TrendBias,
    pub news_active: bool,
    pub session: TradingSession,
    pub session_active: bool,
}

/// One rule of the chain: a pure `(matches, apply)` pair.
pub trait FilterRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Terminal rules end the chain when they match; boost rules fall
    /// through to the remaining rules.
    fn terminal(&self) -> bool {
        true
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool;

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal;
}

/// Left-fold over the rules with early exit on terminal matches.
pub fn run_chain(rules: &[Box<dyn FilterRule>], signal: Signal, ctx: &FilterContext) -> Signal {
    let mut current = signal;
    for rule in rules {
        if rule.matches(&current, ctx) {
            debug!(rule = rule.name(), terminal = rule.terminal(), "filter rule matched");
            current = rule.apply(current, ctx);
            if rule.terminal() {
                return current;
            }
        }
    }
    current
}

/// The production rule set, highest priority first.
pub fn default_chain() -> Vec<Box<dyn FilterRule>> {
    vec![
        Box::new(BreakoutOverride),
        Box::new(NewsVeto),
        Box::new(SessionVeto),
        Box::new(HigherTrendVeto),
        Box::new(ExhaustionVeto),
        Box::new(RiskRewardFloor),
        Box::new(PinConfirmationBoost),
        Box::new(NoiseVeto),
        Box::new(ExtremeOscillatorOverride),
        Box::new(MtfAlignmentAdjust),
    ]
}

/// Rule 1: a volume-confirmed strong breakout replaces the proposal with a
/// high-confidence directional call built from the breakout's own levels.
struct BreakoutOverride;

impl FilterRule for BreakoutOverride {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn matches(&self, _signal: &Signal, ctx: &FilterContext) -> bool {
        ctx.price_action.strong_breakout
            && ctx.volume >= ctx.avg_volume * ctx.profile.volume_spike_mult
    }

    fn apply(&self, _signal: Signal, ctx: &FilterContext) -> Signal {
        let volume_mult = ctx.volume / ctx.avg_volume;
        if ctx.price_action.breakout_above_resistance {
            Signal {
                direction: Direction::Buy,
                confidence: Confidence::High,
                rationale: format!(
                    "Strong breakout above resistance on {:.1}x average volume [filter:{}]",
                    volume_mult,
                    self.name()
                ),
                entry: Some(ctx.candle.close),
                stop_loss: Some(ctx.envelope.stop_buy),
                take_profit: Some(ctx.envelope.target_buy),
            }
        } else {
            Signal {
                direction: Direction::Sell,
                confidence: Confidence::High,
                rationale: format!(
                    "Strong breakout below support on {:.1}x average volume [filter:{}]",
                    volume_mult,
                    self.name()
                ),
                entry: Some(ctx.candle.close),
                stop_loss: Some(ctx.envelope.stop_sell),
                take_profit: Some(ctx.envelope.target_sell),
            }
        }
    }
}

/// Rule 2: an active high-impact macro event forces hold.
struct NewsVeto;

impl FilterRule for NewsVeto {
    fn name(&self) -> &'static str {
        "news"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        ctx.news_active && signal.direction.is_directional()
    }

    fn apply(&self, signal: Signal, _ctx: &FilterContext) -> Signal {
        signal.vetoed("high-impact news event imminent", self.name())
    }
}

/// Rule 3: short-timeframe signals outside the active trading windows are
/// held.
struct SessionVeto;

impl FilterRule for SessionVeto {
    fn name(&self) -> &'static str {
        "session"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        ctx.timeframe.is_short() && !ctx.session_active && signal.direction.is_directional()
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        signal.vetoed(
            &format!("outside active trading windows ({} session)", ctx.session),
            self.name(),
        )
    }
}

/// Rule 4: short-timeframe calls against the higher-timeframe trend are
/// held.
struct HigherTrendVeto;

impl FilterRule for HigherTrendVeto {
    fn name(&self) -> &'static str {
        "htf_trend"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        if !ctx.timeframe.is_short() {
            return false;
        }
        match signal.direction {
            Direction::Buy => ctx.h1_trend.is_bearish() || ctx.d1_trend.is_bearish(),
            Direction::Sell => ctx.h1_trend.is_bullish() || ctx.d1_trend.is_bullish(),
            Direction::Hold => false,
        }
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        signal.vetoed(
            &format!(
                "against higher timeframe trend (H1 {}, D1 {})",
                ctx.h1_trend, ctx.d1_trend
            ),
            self.name(),
        )
    }
}

/// Rule 5: a directional call into an overbought/oversold oscillator
/// without volume confirmation is exhaustion, not momentum.
struct ExhaustionVeto;

impl FilterRule for ExhaustionVeto {
    fn name(&self) -> &'static str {
        "rsi_exhaustion"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        let rsi = ctx.indicators.rsi();
        let volume_weak = ctx.volume < ctx.avg_volume * ctx.profile.volume_confirm_mult;
        match signal.direction {
            Direction::Buy => rsi > ctx.profile.rsi_overbought && volume_weak,
            Direction::Sell => rsi < ctx.profile.rsi_oversold && volume_weak,
            Direction::Hold => false,
        }
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        signal.vetoed(
            &format!(
                "extreme RSI {:.1} without volume confirmation",
                ctx.indicators.rsi()
            ),
            self.name(),
        )
    }
}

/// Rule 6: risk/reward below the timeframe's floor.
struct RiskRewardFloor;

impl FilterRule for RiskRewardFloor {
    fn name(&self) -> &'static str {
        "risk_reward"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        signal.direction.is_directional()
            && ctx.envelope.risk_reward_ratio < ctx.profile.min_risk_reward
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        signal.vetoed(
            &format!(
                "risk/reward {:.1}:1 below minimum {:.1}:1",
                ctx.envelope.risk_reward_ratio, ctx.profile.min_risk_reward
            ),
            self.name(),
        )
    }
}

/// Rule 7 (boost): a call aligned with a pin bar gains confidence. Falls
/// through to the remaining rules.
struct PinConfirmationBoost;

impl FilterRule for PinConfirmationBoost {
    fn name(&self) -> &'static str {
        "pin_confirmation"
    }

    fn terminal(&self) -> bool {
        false
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        match signal.direction {
            Direction::Buy => ctx.price_action.is_bullish_pin,
            Direction::Sell => ctx.price_action.is_bearish_pin,
            Direction::Hold => false,
        }
    }

    fn apply(&self, signal: Signal, _ctx: &FilterContext) -> Signal {
        signal.boosted("Confirmed by price action", self.name())
    }
}

/// Rule 8: a noise candle carries no directional information.
struct NoiseVeto;

impl FilterRule for NoiseVeto {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        ctx.price_action.is_noise && signal.direction.is_directional()
    }

    fn apply(&self, signal: Signal, _ctx: &FilterContext) -> Signal {
        signal.vetoed("noise candle, range below threshold", self.name())
    }
}

/// Rule 9: a deeply oversold/overbought oscillator *with* volume
/// confirmation flips the signal into the reversal direction, overriding
/// the oracle's proposal.
struct ExtremeOscillatorOverride;

impl ExtremeOscillatorOverride {
    fn reversal_direction(&self, ctx: &FilterContext) -> Option<Direction> {
        let rsi = ctx.indicators.rsi();
        if ctx.volume < ctx.avg_volume * ctx.profile.volume_confirm_mult {
            return None;
        }
        if rsi <= ctx.profile.rsi_deep_oversold {
            Some(Direction::Buy)
        } else if rsi >= ctx.profile.rsi_deep_overbought {
            Some(Direction::Sell)
        } else {
            None
        }
    }
}

impl FilterRule for ExtremeOscillatorOverride {
    fn name(&self) -> &'static str {
        "rsi_reversal"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        match self.reversal_direction(ctx) {
            Some(direction) => signal.direction != direction,
            None => false,
        }
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        // reversal_direction is Some here; matches() checked it.
        let direction = self
            .reversal_direction(ctx)
            .unwrap_or(Direction::Hold);
        let (stop, target) = match direction {
            Direction::Buy => (ctx.envelope.stop_buy, ctx.envelope.target_buy),
            _ => (ctx.envelope.stop_sell, ctx.envelope.target_sell),
        };
        Signal {
            direction,
            confidence: Confidence::Medium,
            rationale: format!(
                "{} (Override: RSI {:.1} at volume-confirmed extreme) [filter:{}]",
                signal.rationale,
                ctx.indicators.rsi(),
                self.name()
            ),
            entry: Some(ctx.candle.close),
            stop_loss: Some(stop),
            take_profit: Some(target),
        }
    }
}

/// Rule 10: full higher-timeframe agreement adjusts confidence; full
/// disagreement vetoes. Applies on every timeframe, unlike rule 4.
struct MtfAlignmentAdjust;

impl MtfAlignmentAdjust {
    fn alignment(&self, signal: &Signal, ctx: &FilterContext) -> Option<bool> {
        let (with_h1, with_d1, against_h1, against_d1) = match signal.direction {
            Direction::Buy => (
                ctx.h1_trend.is_bullish(),
                ctx.d1_trend.is_bullish(),
                ctx.h1_trend.is_bearish(),
                ctx.d1_trend.is_bearish(),
            ),
            Direction::Sell => (
                ctx.h1_trend.is_bearish(),
                ctx.d1_trend.is_bearish(),
                ctx.h1_trend.is_bullish(),
                ctx.d1_trend.is_bullish(),
            ),
            Direction::Hold => return None,
        };
        if with_h1 && with_d1 {
            Some(true)
        } else if against_h1 && against_d1 {
            Some(false)
        } else {
            None
        }
    }
}

impl FilterRule for MtfAlignmentAdjust {
    fn name(&self) -> &'static str {
        "mtf_alignment"
    }

    fn matches(&self, signal: &Signal, ctx: &FilterContext) -> bool {
        self.alignment(signal, ctx).is_some()
    }

    fn apply(&self, signal: Signal, ctx: &FilterContext) -> Signal {
        match self.alignment(&signal, ctx) {
            Some(true) => signal.boosted("Aligned with H1 and D1 trend", self.name()),
            Some(false) => signal.vetoed(
                &format!(
                    "both higher timeframes trending against signal (H1 {}, D1 {})",
                    ctx.h1_trend, ctx.d1_trend
                ),
                self.name(),
            ),
            None => signal,
        }
    }
}
