//! # Signal Analyst Shared Types
//!
//! Unified domain model for the signal analyst service: candles and their
//! geometry, indicator snapshots, key levels, timeframe profiles, trading
//! signals and the wire request/response pair.
//!
//! ## Design Philosophy
//!
//! - **Single source of truth**: every service crate consumes these types
//!   instead of re-declaring its own.
//! - **Validated at the boundary**: wire structs carry optional fields and
//!   raw strings exactly as received; the validator in the service resolves
//!   them into the typed model once per request.
//! - **Thresholds live in profiles**: detectors and filters never hardcode
//!   numbers, they read the resolved [`TimeframeProfile`].

pub mod candle;
pub mod market;
pub mod signal;
pub mod timeframe;

pub use candle::{average_range, Candle};
pub use market::{
    AnalysisRequest, AnalysisResponse, HigherTimeframes, Indicators, KeyLevels, MarketContext,
    NewsEvent, NewsImpact, ResponseMeta, TradingSession, TrendBias,
};
pub use signal::{Confidence, Direction, Signal};
pub use timeframe::{Timeframe, TimeframeProfile};
