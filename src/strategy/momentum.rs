use super::{signals::evaluate_signal, SignalConfig, Strategy};
use crate::indicators::{IndicatorSnapshot, LONG_PERIOD};
use crate::models::Signal;
use crate::risk::TradeState;

/// Trend-plus-momentum strategy
///
/// This strategy identifies entries using:
/// - SMA20/SMA50, EMA20/EMA50 and MACD alignment for trend direction
/// - RSI for overbought/oversold conditions
/// - Volume against its 20-period average for optional confirmation
///
/// Repeated entries are debounced through the session's trade state.
#[derive(Debug, Clone, Default)]
pub struct MomentumStrategy {
    config: SignalConfig,
}

impl MomentumStrategy {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MomentumStrategy {
    fn evaluate(&self, row: &IndicatorSnapshot, state: &TradeState) -> Signal {
        evaluate_signal(row, state, &self.config)
    }

    fn name(&self) -> &str {
        "MomentumStrategy"
    }

    fn warmup_candles(&self) -> usize {
        LONG_PERIOD
    }
}
