pub mod bybit;

pub use bybit::BybitClient;

use async_trait::async_trait;

use crate::models::{AccountBalance, OrderAck, OrderIntent, RawCandle};
use crate::Result;

/// Source of kline history for a symbol
///
/// Implementations bound their own wait (request timeout) and report
/// transport or payload problems as `TradingError::Feed`.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch up to `limit` raw klines, newest-first or oldest-first
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<RawCandle>>;
}

/// Venue that accepts protected orders
///
/// Shared by every session, so implementations must be safe for concurrent
/// use without external locking.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit an order, failing with `Execution` on transport problems or
    /// `Rejected` when the venue refuses the parameters
    async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck>;

    /// Balance of the quote currency, for reporting only
    async fn get_balance(&self) -> Result<AccountBalance>;
}
