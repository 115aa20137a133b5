//! # Signal Analyst Service
//!
//! ## Purpose
//!
//! On-demand market snapshot analysis: a caller posts one candle with its
//! indicator context, the service classifies the price action, computes a
//! volatility-scaled risk envelope, asks a language-model oracle for a
//! proposal, and runs that proposal through a prioritized filter chain
//! before caching, notifying and answering.
//!
//! ## Architecture Role
//!
//! ```text
//! HTTP request → [Validator] → [Price Action] + [Risk Assessment]
//!                                     ↓
//!                         [Oracle Proposal (LLM)]
//!                                     ↓
//!                  [Filter Chain] → [Cache] → [Notifier]
//!                                     ↓
//!                              JSON response
//! ```
//!
//! The detector, calculator and filter chain are pure synchronous
//! functions over already-validated data. Only the result cache and the
//! credential rotator are shared mutable state, each guarded internally.

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filters;
pub mod notifier;
pub mod oracle;
pub mod price_action;
pub mod risk;
pub mod server;
pub mod validator;

pub use cache::AnalysisCache;
pub use config::AnalystConfig;
pub use credentials::CredentialRotator;
pub use error::{AnalystError, Result};
pub use filters::{default_chain, run_chain, FilterContext, FilterRule};
pub use oracle::{OracleClient, OracleVerdict};
pub use price_action::{detect, PriceActionReport};
pub use risk::{assess, average_true_range, dynamic_stop, risk_reward, RiskEnvelope};
pub use server::{serve, AppState};
