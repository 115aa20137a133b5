//! Telegram alert delivery
//!
//! Renders the final signal as a Markdown card and posts it to the
//! configured chat. Delivery is best-effort: failures are logged and never
//! surfaced to the request that produced the signal.

use crate::config::TelegramConfig;
use analyst_types::{Direction, Signal, Timeframe};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
            && !self.config.bot_token.is_empty()
            && !self.config.chat_id.is_empty()
    }

    /// Deliver the alert. Logs and swallows every failure.
    pub async fn send_alert(&self, symbol: &str, timeframe: Timeframe, signal: &Signal) {
        if !self.is_enabled() {
            return;
        }

        let text = format_alert(symbol, timeframe, signal, &Utc::now().to_rfc2822());
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = SendMessagePayload {
            chat_id: &self.config.chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(symbol, %timeframe, "telegram alert delivered");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(%status, body, "telegram rejected alert");
            }
            Err(e) => {
                warn!(error = %e, "failed to send telegram alert");
            }
        }
    }
}

/// Render the Markdown alert card.
pub fn format_alert(symbol: &str, timeframe: Timeframe, signal: &Signal, time: &str) -> String {
    let emoji = match signal.direction {
        Direction::Buy => "🟢",
        Direction::Sell => "🔴",
        Direction::Hold => "🟡",
    };

    let trade_details = if signal.direction.is_directional() {
        format!(
            "\n🎯 Entry: {}\n⚠️ Stop Loss: {}\n💰 Take Profit: {}",
            fmt_price(signal.entry),
            fmt_price(signal.stop_loss),
            fmt_price(signal.take_profit),
        )
    } else {
        String::new()
    };

    format!(
        "{emoji} *{direction} Signal* ({confidence} confidence)\n\
         📊 *{symbol}* | {timeframe}{trade_details}\n\
         📌 *Reason*: {rationale}\n\
         🔹 *Time*: {time}",
        emoji = emoji,
        direction = signal.direction.to_string().to_uppercase(),
        confidence = signal.confidence,
        symbol = symbol,
        timeframe = timeframe,
        trade_details = trade_details,
        rationale = signal.rationale,
        time = time,
    )
}

fn fmt_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "N/A".to_string(),
    }
}
