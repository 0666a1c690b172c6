use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Side;

/// Per-symbol memory of the last trade and the debounce counter
///
/// Owned by exactly one trading session. Advanced only after a confirmed
/// order submission; the counter clears on any cycle that holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeState {
    pub last_action: Option<Side>,
    pub consecutive_trades: u32,
    pub current_symbol: Option<String>,
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl TradeState {
    pub fn new(symbol: &str) -> Self {
        Self {
            current_symbol: Some(symbol.to_string()),
            ..Default::default()
        }
    }

    /// Record a submitted and acknowledged order
    pub fn record_trade(&mut self, side: Side) {
        self.last_action = Some(side);
        self.consecutive_trades = self.consecutive_trades.saturating_add(1);
        self.last_trade_at = Some(Utc::now());
    }

    /// Cooldown: a cycle without a buy or sell signal clears the counter
    pub fn record_hold(&mut self) {
        self.consecutive_trades = 0;
    }

    /// Whether the debounce rules allow another trade on `side`
    pub fn allows(&self, side: Side, max_consecutive: u32) -> bool {
        self.consecutive_trades < max_consecutive && self.last_action != Some(side)
    }
}
