// Technical indicators module
// Implements SMA, EMA, RSI, MACD and rolling volatility over a candle series

pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod volatility;

pub use macd::macd_series;
pub use moving_average::{ema_series, sma_series};
pub use rsi::rsi_series;
pub use volatility::volatility_series;

use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::models::CandleSeries;
use crate::Result;

pub const SHORT_PERIOD: usize = 20;
pub const LONG_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_WINDOW: usize = 20;
pub const VOLATILITY_MIN_PERIODS: usize = 5;

/// Derived indicator columns, row-aligned with the candle series
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    pub sma20: Vec<f64>,
    pub sma50: Vec<f64>,
    pub ema20: Vec<f64>,
    pub ema50: Vec<f64>,
    pub rsi: Vec<f64>,
    pub volatility: Vec<f64>,
    pub volume_sma20: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
}

/// One row of the indicator set, the only part the signal evaluator reads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub volume: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub rsi: f64,
    pub volatility: f64,
    pub volume_sma20: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Snapshot of row `i`
    pub fn row(&self, i: usize) -> Option<IndicatorSnapshot> {
        if i >= self.len() {
            return None;
        }

        Some(IndicatorSnapshot {
            close: self.close[i],
            volume: self.volume[i],
            sma20: self.sma20[i],
            sma50: self.sma50[i],
            ema20: self.ema20[i],
            ema50: self.ema50[i],
            rsi: self.rsi[i],
            volatility: self.volatility[i],
            volume_sma20: self.volume_sma20[i],
            macd: self.macd[i],
            macd_signal: self.macd_signal[i],
        })
    }

    /// Most recent row
    pub fn last(&self) -> Option<IndicatorSnapshot> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }
}

/// Compute every indicator for the series
///
/// Degenerate windows degrade to partial-window values; only a structurally
/// empty series is an error.
pub fn compute_indicators(series: &CandleSeries) -> Result<IndicatorSet> {
    if series.is_empty() {
        return Err(TradingError::missing("close"));
    }

    let close = series.closes();
    let volume = series.volumes();

    let (macd, macd_signal) =
        macd_series(&close, macd::MACD_FAST, macd::MACD_SLOW, macd::MACD_SIGNAL);

    let set = IndicatorSet {
        sma20: sma_series(&close, SHORT_PERIOD),
        sma50: sma_series(&close, LONG_PERIOD),
        ema20: ema_series(&close, SHORT_PERIOD),
        ema50: ema_series(&close, LONG_PERIOD),
        rsi: rsi_series(&close, RSI_PERIOD),
        volatility: volatility_series(&close, VOLATILITY_WINDOW, VOLATILITY_MIN_PERIODS),
        volume_sma20: sma_series(&volume, SHORT_PERIOD),
        macd,
        macd_signal,
        close,
        volume,
    };

    tracing::trace!(symbol = %series.symbol(), rows = set.len(), "Computed indicators");

    Ok(set)
}
