//! Language-model oracle client
//!
//! Renders the analysis prompt, calls the completion endpoint with the
//! currently rotated credential, and normalizes the free-text reply into a
//! typed verdict. The filter chain only ever consumes the `Recognized`
//! variant; anything the normalizer cannot make sense of becomes
//! `Unrecognized` and is recovered into a conservative hold upstream.

use crate::config::OracleConfig;
use crate::credentials::CredentialRotator;
use crate::error::{AnalystError, Result};
use crate::price_action::PriceActionReport;
use crate::risk::RiskEnvelope;
use analyst_types::{
    Candle, Confidence, Direction, Indicators, KeyLevels, Signal, Timeframe, TradingSession,
    TrendBias,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Normalized outcome of an oracle call.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleVerdict {
    Recognized(Signal),
    Unrecognized { raw: String, error: String },
}

/// Everything the prompt renders, borrowed from the request pipeline.
pub struct PromptContext<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    pub candle: &'a Candle,
    pub indicators: &'a Indicators,
    pub volume: f64,
    pub avg_volume: f64,
    pub levels: &'a KeyLevels,
    pub h1_trend: TrendBias,
    pub d1_trend: TrendBias,
    pub session: TradingSession,
    pub price_action: &'a PriceActionReport,
    pub envelope: &'a RiskEnvelope,
    pub min_risk_reward: f64,
    pub volume_spike_mult: f64,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Loosely shaped reply the oracle is asked to produce. Field-name
/// synonyms are accepted; vocabulary normalization happens afterwards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    #[serde(alias = "direction")]
    signal: Option<String>,
    confidence: Option<String>,
    #[serde(alias = "reason", alias = "rationale")]
    explanation: Option<String>,
    entry: Option<f64>,
    #[serde(alias = "stop_loss", alias = "sl")]
    stop_loss: Option<f64>,
    #[serde(alias = "take_profit", alias = "tp")]
    take_profit: Option<f64>,
}

pub struct OracleClient {
    client: reqwest::Client,
    config: OracleConfig,
    rotator: Arc<CredentialRotator>,
}

impl OracleClient {
    pub fn new(config: OracleConfig, rotator: Arc<CredentialRotator>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalystError::Configuration {
                message: format!("failed to build oracle HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            config,
            rotator,
        })
    }

    /// Call the completion endpoint and normalize the reply.
    ///
    /// A timed-out call is a normal failure: it comes back as an
    /// `Unrecognized` verdict (recovered into a hold upstream), never
    /// retried. A reachable endpoint answering non-2xx is an upstream
    /// error.
    pub async fn propose(&self, prompt: &str) -> Result<OracleVerdict> {
        self.rotator.rotate_if_due();
        let api_key = self
            .rotator
            .current()
            .ok_or_else(|| AnalystError::Configuration {
                message: "no oracle API keys configured".to_string(),
            })?
            .to_string();

        let payload = ChatPayload {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.1,
            max_tokens: 250,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = match self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("oracle call timed out after {}s", self.config.timeout_secs);
                return Ok(OracleVerdict::Unrecognized {
                    raw: String::new(),
                    error: "oracle request timed out".to_string(),
                });
            }
            Err(e) => {
                return Err(AnalystError::Upstream {
                    status: 0,
                    body: e.to_string(),
                });
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AnalystError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let content = match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) => parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "oracle response envelope was not valid JSON");
                String::new()
            }
        };

        debug!(bytes = content.len(), "oracle reply received");
        Ok(normalize_response(&content))
    }
}

/// Normalize the oracle's free text into a verdict.
///
/// Tolerates fenced code blocks around the JSON object and synonym
/// vocabulary for direction and confidence.
pub fn normalize_response(text: &str) -> OracleVerdict {
    let cleaned = strip_fences(text);
    if cleaned.is_empty() {
        return OracleVerdict::Unrecognized {
            raw: text.to_string(),
            error: "empty oracle reply".to_string(),
        };
    }

    let raw: RawReply = match serde_json::from_str(&cleaned) {
        Ok(raw) => raw,
        Err(e) => {
            return OracleVerdict::Unrecognized {
                raw: text.to_string(),
                error: format!("not a JSON object: {}", e),
            }
        }
    };

    let Some(direction) = raw.signal.as_deref().and_then(parse_direction) else {
        return OracleVerdict::Unrecognized {
            raw: text.to_string(),
            error: format!("unrecognized signal value {:?}", raw.signal),
        };
    };

    let confidence = raw
        .confidence
        .as_deref()
        .map(parse_confidence)
        .unwrap_or(Confidence::Medium);

    OracleVerdict::Recognized(Signal {
        direction,
        confidence,
        rationale: raw
            .explanation
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "No explanation provided".to_string()),
        entry: raw.entry.filter(|v| v.is_finite()),
        stop_loss: raw.stop_loss.filter(|v| v.is_finite()),
        take_profit: raw.take_profit.filter(|v| v.is_finite()),
    })
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_direction(raw: &str) -> Option<Direction> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "buy" | "long" | "bullish" => Some(Direction::Buy),
        "sell" | "short" | "bearish" => Some(Direction::Sell),
        "hold" | "wait" | "neutral" | "none" | "flat" => Some(Direction::Hold),
        _ => None,
    }
}

fn parse_confidence(raw: &str) -> Confidence {
    match raw.trim().to_ascii_lowercase().as_str() {
        "high" | "strong" | "very high" => Confidence::High,
        "low" | "weak" | "very low" => Confidence::Low,
        _ => Confidence::Medium,
    }
}

/// Render the analyst prompt for the oracle.
pub fn render_prompt(ctx: &PromptContext) -> String {
    let pattern = if ctx.price_action.is_bullish_pin {
        "Bullish pin bar detected"
    } else if ctx.price_action.is_bearish_pin {
        "Bearish pin bar detected"
    } else if ctx.price_action.strong_bullish {
        "Strong bullish candle"
    } else if ctx.price_action.strong_bearish {
        "Strong bearish candle"
    } else {
        "No strong pattern"
    };

    let rejection = if ctx.price_action.rejection_at_resistance {
        "Rejection at resistance"
    } else if ctx.price_action.rejection_at_support {
        "Rejection at support"
    } else {
        "No rejection"
    };

    let volume_mult = ctx.volume / ctx.avg_volume;
    let volume_state = if ctx.volume > ctx.avg_volume * ctx.volume_spike_mult {
        "HIGH"
    } else {
        "Normal"
    };

    let rsi = ctx.indicators.rsi();
    let rsi_state = if rsi > 70.0 {
        "Overbought"
    } else if rsi < 30.0 {
        "Oversold"
    } else {
        "Neutral"
    };

    format!(
        "Act as a professional trading analyst. Strictly follow these rules:\n\
         1. Trend alignment: never contradict the higher timeframe trend (H1/D1).\n\
         2. Price action: {pattern}.\n\
         3. Key levels: {rejection}.\n\
         4. Volume confirmation: current {volume_mult:.1}x average volume.\n\
         5. Risk/reward: {rr:.1}:1 (minimum {min_rr:.1}:1 required).\n\
         \n\
         Current analysis:\n\
         - Symbol: {symbol} ({timeframe})\n\
         - Price: O={open} H={high} L={low} C={close}\n\
         - Trend: fast MA {ma_rel} slow MA\n\
         - RSI: {rsi:.1} ({rsi_state})\n\
         - MACD: {macd_state} crossover\n\
         - Volume: {volume_state} ({volume} vs avg {avg_volume})\n\
         - Key levels: S1={support}, R1={resistance}\n\
         - Higher TF: H1={h1}, D1={d1}\n\
         - Session: {session}\n\
         - ATR: {atr:.5}\n\
         \n\
         Provide a JSON response: {{ \"signal\": \"buy/sell/hold\", \
         \"confidence\": \"high/medium/low\", \"explanation\": \"...\", \
         \"entry\": number, \"stopLoss\": number, \"takeProfit\": number }}",
        pattern = pattern,
        rejection = rejection,
        volume_mult = volume_mult,
        rr = ctx.envelope.risk_reward_ratio,
        min_rr = ctx.min_risk_reward,
        symbol = ctx.symbol,
        timeframe = ctx.timeframe,
        open = ctx.candle.open,
        high = ctx.candle.high,
        low = ctx.candle.low,
        close = ctx.candle.close,
        ma_rel = if ctx.indicators.ema_fast() > ctx.indicators.ema_slow() {
            ">"
        } else {
            "<"
        },
        rsi = rsi,
        rsi_state = rsi_state,
        macd_state = if ctx.indicators.macd() > ctx.indicators.macd_signal() {
            "Bullish"
        } else {
            "Bearish"
        },
        volume_state = volume_state,
        volume = ctx.volume,
        avg_volume = ctx.avg_volume,
        support = ctx.levels.support,
        resistance = ctx.levels.resistance,
        h1 = ctx.h1_trend,
        d1 = ctx.d1_trend,
        session = ctx.session,
        atr = ctx.envelope.atr,
    )
}
