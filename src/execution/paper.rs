use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::api::OrderGateway;
use crate::error::TradingError;
use crate::models::{AccountBalance, OrderAck, OrderIntent, Side};
use crate::Result;

/// Accepted intents kept for inspection
const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Local venue that acknowledges orders without routing them
///
/// Enforces the minimum notional and the available quote balance, and keeps
/// the most recent accepted intents for inspection.
pub struct PaperGateway {
    min_notional: f64,
    history_limit: usize,
    book: Mutex<PaperBook>,
}

struct PaperBook {
    balance: AccountBalance,
    submitted: VecDeque<OrderIntent>,
    accepted: u64,
}

impl PaperGateway {
    pub fn new(available: f64, total: f64, min_notional: f64) -> Self {
        Self {
            min_notional,
            history_limit: DEFAULT_HISTORY_LIMIT,
            book: Mutex::new(PaperBook {
                balance: AccountBalance { available, total },
                submitted: VecDeque::new(),
                accepted: 0,
            }),
        }
    }

    /// Keep at most `limit` accepted intents in memory
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Most recent accepted intents, oldest first
    pub fn submitted(&self) -> Vec<OrderIntent> {
        self.book().submitted.iter().cloned().collect()
    }

    /// Number of orders accepted since start, including ones no longer kept
    pub fn accepted_count(&self) -> u64 {
        self.book().accepted
    }

    fn book(&self) -> MutexGuard<'_, PaperBook> {
        // The book stays consistent even if a holder panicked
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck> {
        let notional = intent.notional().to_f64().unwrap_or(0.0);

        if intent.quantity.is_sign_negative() || intent.quantity.is_zero() {
            return Err(TradingError::Rejected(format!(
                "quantity {} must be positive",
                intent.quantity
            )));
        }

        if notional < self.min_notional {
            return Err(TradingError::Rejected(format!(
                "notional {:.4} below minimum {:.4}",
                notional, self.min_notional
            )));
        }

        let mut book = self.book();

        if intent.side == Side::Buy && notional > book.balance.available {
            return Err(TradingError::Rejected(format!(
                "insufficient balance: need {:.2}, available {:.2}",
                notional, book.balance.available
            )));
        }

        match intent.side {
            Side::Buy => book.balance.available -= notional,
            Side::Sell => book.balance.available += notional,
        }
        book.accepted += 1;
        if self.history_limit > 0 {
            if book.submitted.len() == self.history_limit {
                book.submitted.pop_front();
            }
            book.submitted.push_back(intent.clone());
        }

        let ack = OrderAck {
            order_id: format!("paper-{}", Uuid::new_v4().simple()),
            client_order_id: intent.client_order_id,
            symbol: intent.symbol.clone(),
            side: intent.side,
            accepted_at: Utc::now(),
        };

        tracing::info!(
            "  📝 Paper {} {} {} @ {} accepted as {}",
            intent.side,
            intent.quantity,
            intent.symbol,
            intent.limit_price,
            ack.order_id
        );

        Ok(ack)
    }

    async fn get_balance(&self) -> Result<AccountBalance> {
        Ok(self.book().balance)
    }
}
