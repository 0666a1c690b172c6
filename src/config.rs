//! Bot configuration

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::risk::RiskConfig;
use crate::strategy::SignalConfig;
use crate::Result;

/// Upper bound for market-data fetch attempts per cycle
pub const MAX_FETCH_RETRIES: u32 = 10;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub risk: RiskConfig,
    pub signal: SignalConfig,
    pub paper: PaperConfig,
    /// Enables trade state checkpoints when set
    pub redis_url: Option<String>,
}

/// Market data venue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub category: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub requests_per_minute: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bybit.com".to_string(),
            category: "spot".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            requests_per_minute: 120,
        }
    }
}

/// Polling schedule and the sessions to run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub poll_interval_secs: u64,
    pub candle_window: usize,
    pub sessions: Vec<SessionConfig>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            candle_window: 200,
            sessions: vec![SessionConfig::default()],
        }
    }
}

/// One symbol to trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub symbol: String,
    pub interval: String,
    pub base_qty: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol: "SUIUSDT".to_string(),
            interval: "15".to_string(),
            base_qty: 0.1,
        }
    }
}

/// Simulated venue used when orders are not routed to an exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub available_balance: f64,
    pub total_balance: f64,
    pub min_notional: f64,
    /// Accepted orders kept in memory for inspection
    pub history_limit: usize,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            available_balance: 1000.0,
            total_balance: 1000.0,
            min_notional: 1.0,
            history_limit: 256,
        }
    }
}

impl BotConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (`AUTOTRADER__SECTION__KEY`)
    /// 2. Configuration file
    /// 3. Defaults
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path).required(false));
            } else {
                tracing::warn!("Config file {} not found, using defaults", path);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("AUTOTRADER")
                .separator("__")
                .try_parsing(true),
        );

        let config: BotConfig = builder
            .build()
            .map_err(|e| TradingError::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TradingError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trading.poll_interval_secs == 0 {
            return Err(TradingError::Configuration(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.trading.candle_window == 0 {
            return Err(TradingError::Configuration(
                "candle_window must be positive".to_string(),
            ));
        }
        if self.exchange.max_retries == 0 || self.exchange.max_retries > MAX_FETCH_RETRIES {
            return Err(TradingError::Configuration(format!(
                "max_retries must be between 1 and {}, got {}",
                MAX_FETCH_RETRIES, self.exchange.max_retries
            )));
        }
        if self.exchange.timeout_secs == 0 {
            return Err(TradingError::Configuration(
                "timeout_secs must be positive".to_string(),
            ));
        }

        self.risk.validate()?;
        self.signal.validate()
    }
}
