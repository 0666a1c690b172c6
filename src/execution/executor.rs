use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::api::OrderGateway;
use crate::error::TradingError;
use crate::models::{OrderAck, OrderIntent, Side};
use crate::risk::{RiskConfig, TradeState};
use crate::Result;

/// Builds protected orders and submits them through the venue gateway
pub struct OrderExecutor {
    gateway: Arc<dyn OrderGateway>,
    risk: RiskConfig,
}

impl OrderExecutor {
    pub fn new(gateway: Arc<dyn OrderGateway>, risk: RiskConfig) -> Self {
        Self { gateway, risk }
    }

    /// Build an order with entry, stop-loss and take-profit around `current_price`
    ///
    /// The limit price is offset toward the fill (above for buys, below for
    /// sells). Prices and quantity are rounded to the venue precision.
    pub fn build_order_intent(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        current_price: f64,
    ) -> Result<OrderIntent> {
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(TradingError::missing("close"));
        }

        let (limit, stop_loss, take_profit) = match side {
            Side::Buy => (
                current_price * (1.0 + self.risk.slippage_pct),
                current_price * (1.0 - self.risk.stop_loss_pct),
                current_price * (1.0 + self.risk.take_profit_pct),
            ),
            Side::Sell => (
                current_price * (1.0 - self.risk.slippage_pct),
                current_price * (1.0 + self.risk.stop_loss_pct),
                current_price * (1.0 - self.risk.take_profit_pct),
            ),
        };

        Ok(OrderIntent {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            quantity: round_to(quantity, self.risk.qty_precision, "quantity")?,
            limit_price: round_to(limit, self.risk.price_precision, "limit price")?,
            stop_loss: round_to(stop_loss, self.risk.price_precision, "stop loss")?,
            take_profit: round_to(take_profit, self.risk.price_precision, "take profit")?,
        })
    }

    /// Build and submit an order, advancing `state` only on acknowledgment
    ///
    /// Failed submissions are returned as-is and never retried: the intent is
    /// priced off this cycle's candles.
    pub async fn execute(
        &self,
        state: &mut TradeState,
        symbol: &str,
        side: Side,
        quantity: f64,
        current_price: f64,
    ) -> Result<(OrderIntent, OrderAck)> {
        let intent = self.build_order_intent(symbol, side, quantity, current_price)?;

        tracing::info!(
            "  → {} {} {} @ {} (SL {} / TP {})",
            side,
            intent.quantity,
            symbol,
            intent.limit_price,
            intent.stop_loss,
            intent.take_profit
        );

        match self.gateway.submit_order(&intent).await {
            Ok(ack) => {
                state.record_trade(side);
                tracing::info!(
                    "  ✓ Order {} accepted ({} consecutive)",
                    ack.order_id,
                    state.consecutive_trades
                );
                Ok((intent, ack))
            }
            Err(e) => {
                tracing::warn!("  ✗ Order for {} not placed: {}", symbol, e);
                Err(e)
            }
        }
    }
}

fn round_to(value: f64, decimals: u32, what: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| TradingError::Execution(format!("{} {} is not representable", what, value)))
}
