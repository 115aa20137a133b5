//! Service configuration

use crate::error::{AnalystError, Result};
use analyst_types::{Timeframe, TimeframeProfile, TradingSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Oracle (language-model completion endpoint) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    /// Ordered upstream API keys; rotated on a fixed interval.
    #[serde(default)]
    pub api_keys: Vec<String>,
    pub timeout_secs: u64,
    pub rotation_interval_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://free.v36.cm/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_keys: Vec::new(),
            timeout_secs: 5,
            rotation_interval_secs: 900,
        }
    }
}

/// Telegram alert delivery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// HTTP listen port.
    pub listen_port: u16,

    /// Shared-secret value expected in the `x-api-key` header.
    #[serde(default)]
    pub api_token: String,

    /// Result cache TTL; entries older than twice this are swept.
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,

    /// A high-impact event within this many minutes counts as active news.
    pub news_window_minutes: i64,

    /// Sessions during which short-timeframe signals are allowed.
    pub active_sessions: Vec<TradingSession>,

    pub oracle: OracleConfig,

    pub telegram: TelegramConfig,

    /// Per-timeframe threshold overrides; timeframes absent here use the
    /// built-in defaults.
    #[serde(default)]
    pub profiles: HashMap<String, TimeframeProfile>,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            api_token: String::new(),
            cache_ttl_secs: 30,
            sweep_interval_secs: 60,
            news_window_minutes: 30,
            active_sessions: vec![
                TradingSession::London,
                TradingSession::NewYork,
                TradingSession::LondonNewYork,
            ],
            oracle: OracleConfig::default(),
            telegram: TelegramConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

impl AnalystConfig {
    /// Resolve the threshold profile for a timeframe: configured override if
    /// present, built-in default otherwise. Done once at request entry.
    pub fn profile_for(&self, timeframe: Timeframe) -> TimeframeProfile {
        self.profiles
            .get(&timeframe.to_string())
            .cloned()
            .unwrap_or_else(|| TimeframeProfile::default_for(timeframe))
    }

    /// Load configuration from a TOML file, then apply environment-variable
    /// secret overrides. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| AnalystError::Configuration {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        info!(
            port = config.listen_port,
            oracle = %config.oracle.endpoint,
            keys = config.oracle.api_keys.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Secrets come from the environment, never from the config file on
    /// shared deployments.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("ANALYST_API_TOKEN") {
            self.api_token = token;
        }
        if let Ok(keys) = std::env::var("ANALYST_ORACLE_API_KEYS") {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            if !keys.is_empty() {
                self.oracle.api_keys = keys;
            }
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
    }
}

/// Resolve the config file path from the environment with a fallback.
pub fn resolve_config_path() -> String {
    std::env::var("ANALYST_CONFIG_PATH").unwrap_or_else(|_| "configs/analyst.toml".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalystConfig::default();

        assert_eq!(config.cache_ttl_secs, 30);
        assert_eq!(config.oracle.timeout_secs, 5);
        assert!(config
            .active_sessions
            .contains(&TradingSession::LondonNewYork));
    }

    #[test]
    fn test_profile_resolution_falls_back_to_defaults() {
        let config = AnalystConfig::default();
        let profile = config.profile_for(Timeframe::H1);

        assert_eq!(profile.min_history, 30);
    }

    #[test]
    fn test_profile_override() {
        let mut config = AnalystConfig::default();
        let mut custom = TimeframeProfile::default_for(Timeframe::M5);
        custom.min_risk_reward = 2.5;
        config.profiles.insert("M5".to_string(), custom);

        assert_eq!(config.profile_for(Timeframe::M5).min_risk_reward, 2.5);
        assert_eq!(config.profile_for(Timeframe::H1).min_risk_reward, 1.8);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AnalystConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: AnalystConfig = toml::from_str(&rendered).unwrap();

        assert_eq!(parsed.listen_port, config.listen_port);
        assert_eq!(parsed.oracle.model, config.oracle.model);
    }
}
