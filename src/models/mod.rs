pub mod series;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use series::CandleSeries;

/// One kline row exactly as the venue delivers it:
/// `[timestamp, open, high, low, close, volume, turnover]` as strings
pub type RawCandle = Vec<String>;

/// OHLCV candlestick, normalized and validated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: i64, // venue epoch unit (ms for Bybit)
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub turnover: f64,
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// The order side this signal would trade, if any
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::Hold => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Venue spelling of the side
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protected order ready for submission
///
/// Built fresh for every execution and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderIntent {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl OrderIntent {
    pub fn notional(&self) -> Decimal {
        self.quantity * self.limit_price
    }
}

/// Venue acknowledgment of an accepted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub accepted_at: DateTime<Utc>,
}

/// Account balance in the quote currency, for reporting only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AccountBalance {
    pub available: f64,
    pub total: f64,
}
