//! Trading signal definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn is_directional(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
            Direction::Hold => write!(f, "hold"),
        }
    }
}

/// Signal confidence bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// A normalized trade recommendation.
///
/// Starts life as the oracle's proposal and is then reshaped by the filter
/// chain; the value that leaves the chain is what gets cached, notified and
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub direction: Direction,
    pub confidence: Confidence,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

impl Signal {
    /// Conservative default used whenever the oracle's output cannot be
    /// trusted: hold with low confidence and the failure reason attached.
    pub fn safe_hold(rationale: impl Into<String>) -> Self {
        Self {
            direction: Direction::Hold,
            confidence: Confidence::Low,
            rationale: rationale.into(),
            entry: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// Turn this signal into a vetoed hold, appending a machine-parseable
    /// reason suffix so the final explanation stays auditable.
    pub fn vetoed(mut self, reason: &str, rule: &str) -> Self {
        self.direction = Direction::Hold;
        self.confidence = Confidence::Low;
        self.rationale = format!("{} (Rejected: {}) [filter:{}]", self.rationale, reason, rule);
        self.entry = None;
        self.stop_loss = None;
        self.take_profit = None;
        self
    }

    /// Raise confidence to high and annotate the rationale; the direction is
    /// left untouched.
    pub fn boosted(mut self, note: &str, rule: &str) -> Self {
        self.confidence = Confidence::High;
        self.rationale = format!("{} ({}) [filter:{}]", self.rationale, note, rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_hold() {
        let signal = Signal::safe_hold("oracle unreachable");

        assert_eq!(signal.direction, Direction::Hold);
        assert_eq!(signal.confidence, Confidence::Low);
        assert!(signal.entry.is_none());
    }

    #[test]
    fn test_veto_annotation() {
        let signal = Signal {
            direction: Direction::Buy,
            confidence: Confidence::High,
            rationale: "Momentum breakout".to_string(),
            entry: Some(1.08),
            stop_loss: Some(1.05),
            take_profit: Some(1.12),
        };

        let vetoed = signal.vetoed("against D1 trend", "htf_trend");

        assert_eq!(vetoed.direction, Direction::Hold);
        assert_eq!(vetoed.confidence, Confidence::Low);
        assert!(vetoed.rationale.contains("Momentum breakout"));
        assert!(vetoed.rationale.contains("(Rejected: against D1 trend)"));
        assert!(vetoed.rationale.contains("[filter:htf_trend]"));
        assert!(vetoed.entry.is_none());
    }

    #[test]
    fn test_boost_keeps_direction() {
        let signal = Signal {
            direction: Direction::Sell,
            confidence: Confidence::Medium,
            rationale: "RSI divergence".to_string(),
            entry: None,
            stop_loss: None,
            take_profit: None,
        };

        let boosted = signal.boosted("Confirmed by price action", "pin_confirmation");

        assert_eq!(boosted.direction, Direction::Sell);
        assert_eq!(boosted.confidence, Confidence::High);
        assert!(boosted.rationale.contains("[filter:pin_confirmation]"));
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }
}
