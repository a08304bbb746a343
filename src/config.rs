use std::path::Path;

use serde::Deserialize;

use crate::decision::RiskConfig;
use crate::gate::GateConfig;
use crate::signal::SignalConfig;

/// Retry policy for transient API failures: `max_attempts` tries, with a
/// delay that starts at `base_delay_secs` and doubles per attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 5,
        }
    }
}

/// Static configuration for one bot session, assembled once at startup.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub signal: SignalConfig,
    pub risk: RiskConfig,
    pub gate: GateConfig,
    pub retry: RetryConfig,
}

fn env_f64(name: &str, current: &mut f64) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<f64>() {
            Ok(value) => *current = value,
            Err(_) => tracing::warn!("ignoring unparseable {}='{}'", name, raw),
        }
    }
}

fn env_u32(name: &str, current: &mut u32) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<u32>() {
            Ok(value) => *current = value,
            Err(_) => tracing::warn!("ignoring unparseable {}='{}'", name, raw),
        }
    }
}

fn env_usize(name: &str, current: &mut usize) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<usize>() {
            Ok(value) => *current = value,
            Err(_) => tracing::warn!("ignoring unparseable {}='{}'", name, raw),
        }
    }
}

impl BotConfig {
    /// Defaults overridden by environment variables where set. Bad values
    /// are logged and skipped rather than aborting startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_f64("RSI_OVERSOLD", &mut config.signal.rsi_oversold);
        env_f64("RSI_OVERBOUGHT", &mut config.signal.rsi_overbought);
        env_f64("RISK_PER_TRADE", &mut config.risk.risk_per_trade);
        env_f64("MAX_RISK", &mut config.risk.max_risk);
        env_f64("PROFITABILITY", &mut config.risk.profitability);
        env_f64("STOP_LOSS", &mut config.risk.stop_loss);
        env_usize("MAX_DAILY_TRADES", &mut config.gate.max_daily_trades);
        env_f64("MAX_PRICE_MOVE", &mut config.gate.max_price_move);
        env_u32("RETRY_MAX_ATTEMPTS", &mut config.retry.max_attempts);
        if let Ok(raw) = std::env::var("RETRY_BASE_DELAY_SECS") {
            match raw.parse::<u64>() {
                Ok(value) => config.retry.base_delay_secs = value,
                Err(_) => tracing::warn!("ignoring unparseable RETRY_BASE_DELAY_SECS='{}'", raw),
            }
        }

        config
    }
}

/// Operator-editable settings polled from a JSON file between cycles, so
/// the poll cadence and traded pairs can change without a restart.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuntimeSettings {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_pairs() -> Vec<String> {
    vec!["BTC-BRL".to_string()]
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            pairs: default_pairs(),
        }
    }
}

impl RuntimeSettings {
    /// Read the settings file. A missing or malformed file falls back to
    /// defaults with a warning; the bot keeps running either way.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    "settings file {} unreadable ({}), using defaults",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "settings file {} malformed ({}), using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.signal.min_buy_votes, 3);
        assert_eq!(config.risk.risk_per_trade, 0.10);
        assert_eq!(config.gate.max_daily_trades, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_secs, 5);
    }

    #[test]
    fn test_settings_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = RuntimeSettings::load(&dir.path().join("interval.json"));
        assert_eq!(settings, RuntimeSettings::default());
        assert_eq!(settings.interval_seconds, 30);
        assert_eq!(settings.pairs, vec!["BTC-BRL".to_string()]);
    }

    #[test]
    fn test_settings_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interval.json");
        std::fs::write(&path, r#"{"interval_seconds": 60}"#).unwrap();

        let settings = RuntimeSettings::load(&path);
        assert_eq!(settings.interval_seconds, 60);
        assert_eq!(settings.pairs, vec!["BTC-BRL".to_string()]);
    }

    #[test]
    fn test_settings_malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interval.json");
        std::fs::write(&path, "{not json").unwrap();

        let settings = RuntimeSettings::load(&path);
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[test]
    fn test_settings_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interval.json");
        std::fs::write(
            &path,
            r#"{"interval_seconds": 15, "pairs": ["BTC-BRL", "ETH-BRL"]}"#,
        )
        .unwrap();

        let settings = RuntimeSettings::load(&path);
        assert_eq!(settings.interval_seconds, 15);
        assert_eq!(settings.pairs.len(), 2);
    }
}
