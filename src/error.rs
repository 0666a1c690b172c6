use thiserror::Error;

/// Failures surfaced by the trading core
///
/// Everything except `Configuration` and `AlreadyRunning` is contained by the
/// scheduler: the cycle is skipped and the loop carries on.
#[derive(Debug, Error)]
pub enum TradingError {
    /// Market data could not be retrieved (transport, timeout, bad payload)
    #[error("feed error: {0}")]
    Feed(String),

    /// A required candle column is structurally absent
    #[error("missing data: column `{column}` is absent")]
    MissingData { column: String },

    /// Order submission failed in transport
    #[error("execution error: {0}")]
    Execution(String),

    /// The venue refused the order parameters
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Invalid risk or signal parameters, only raised at session start
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("a trading session for {0} is already running")]
    AlreadyRunning(String),

    /// Trade state checkpoint could not be read or written
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl TradingError {
    pub fn missing(column: impl Into<String>) -> Self {
        Self::MissingData {
            column: column.into(),
        }
    }

    /// Whether the scheduler should log and continue rather than abort
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::AlreadyRunning(_))
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::Feed(format!("request timed out: {}", err))
        } else {
            TradingError::Feed(err.to_string())
        }
    }
}

impl From<redis::RedisError> for TradingError {
    fn from(err: redis::RedisError) -> Self {
        TradingError::Checkpoint(err.to_string())
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Checkpoint(err.to_string())
    }
}
