// Trading strategy module
pub mod momentum;
pub mod signals;

pub use momentum::MomentumStrategy;
pub use signals::{evaluate_signal, SignalConfig, TrendRule};

use crate::error::TradingError;
use crate::indicators::{compute_indicators, IndicatorSnapshot};
use crate::models::{CandleSeries, Signal};
use crate::risk::TradeState;
use crate::Result;

/// Base trait for all trading strategies
pub trait Strategy: Send + Sync {
    /// Decide on the latest indicator row given the session's trade memory
    fn evaluate(&self, row: &IndicatorSnapshot, state: &TradeState) -> Signal;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Candles needed before every indicator uses its full window
    fn warmup_candles(&self) -> usize;

    /// Compute indicators for the series and evaluate the latest row
    fn generate_signal(
        &self,
        series: &CandleSeries,
        state: &TradeState,
    ) -> Result<(Signal, IndicatorSnapshot)> {
        let indicators = compute_indicators(series)?;
        let row = indicators.last().ok_or_else(|| TradingError::missing("close"))?;

        Ok((self.evaluate(&row, state), row))
    }
}
