use std::collections::BTreeMap;

use super::{Candle, RawCandle};
use crate::error::TradingError;
use crate::Result;

/// Positional column names of a raw kline row
pub const KLINE_COLUMNS: [&str; 7] = [
    "timestamp", "open", "high", "low", "close", "volume", "turnover",
];

/// Chronological, bounded candle history for one (symbol, interval) pair
///
/// Built wholesale from a fetch on every cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    interval: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Normalize raw venue rows into a series
    ///
    /// Rows may be newest-first or oldest-first. Rows missing a column fail the
    /// whole fetch; rows with unparseable or out-of-range values are dropped.
    /// Only the newest `window` candles are kept.
    pub fn from_raw(
        symbol: &str,
        interval: &str,
        rows: &[RawCandle],
        window: usize,
    ) -> Result<Self> {
        let mut candles = Vec::with_capacity(rows.len());

        for row in rows {
            if row.len() < KLINE_COLUMNS.len() {
                return Err(TradingError::missing(KLINE_COLUMNS[row.len()]));
            }

            match parse_row(row) {
                Some(candle) => candles.push(candle),
                None => {
                    tracing::debug!(symbol = %symbol, row = ?row, "Dropping malformed candle");
                }
            }
        }

        Self::from_candles(symbol, interval, candles, window)
    }

    /// Normalize already-parsed candles (sort ascending, dedup, bound)
    pub fn from_candles(
        symbol: &str,
        interval: &str,
        candles: Vec<Candle>,
        window: usize,
    ) -> Result<Self> {
        // Later duplicates win, ordering comes from the map
        let by_time: BTreeMap<i64, Candle> =
            candles.into_iter().map(|c| (c.timestamp, c)).collect();

        let mut candles: Vec<Candle> = by_time.into_values().collect();

        if candles.is_empty() {
            return Err(TradingError::missing("close"));
        }

        if window > 0 && candles.len() > window {
            candles.drain(..candles.len() - window);
        }

        Ok(Self {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Most recent candle
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}

fn parse_row(row: &[String]) -> Option<Candle> {
    let timestamp: i64 = row[0].trim().parse().ok()?;

    let mut values = [0.0f64; 6];
    for (slot, raw) in values.iter_mut().zip(&row[1..7]) {
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        *slot = value;
    }

    let [open, high, low, close, volume, turnover] = values;

    if open <= 0.0 || high <= 0.0 || low <= 0.0 || close <= 0.0 {
        return None;
    }
    if volume < 0.0 || turnover < 0.0 {
        return None;
    }

    Some(Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
        turnover,
    })
}
