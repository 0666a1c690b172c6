use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};

use crate::error::TradingError;
use crate::risk::TradeState;
use crate::Result;

/// Durable home for per-symbol trade state between restarts
#[async_trait]
pub trait TradeStateStore: Send + Sync {
    async fn load(&self, symbol: &str) -> Result<Option<TradeState>>;

    async fn save(&self, symbol: &str, state: &TradeState) -> Result<()>;

    async fn clear(&self, symbol: &str) -> Result<()>;
}

fn state_key(symbol: &str) -> String {
    format!("trade_state:{}", symbol)
}

/// Redis checkpoint store
///
/// Stores one JSON document per symbol under `trade_state:{symbol}`.
#[derive(Clone)]
pub struct RedisTradeStateStore {
    conn: ConnectionManager,
}

impl RedisTradeStateStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        // Add 5 second timeout to connection attempt
        let conn = timeout(Duration::from_secs(5), ConnectionManager::new(client))
            .await
            .map_err(|_| {
                TradingError::Checkpoint("Redis connection timeout after 5 seconds".to_string())
            })??;

        tracing::info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

#[async_trait]
impl TradeStateStore for RedisTradeStateStore {
    async fn load(&self, symbol: &str) -> Result<Option<TradeState>> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.get(state_key(symbol)).await?;

        match stored {
            Some(json) => {
                let state: TradeState = serde_json::from_str(&json)?;
                tracing::info!(
                    "Restored trade state for {} (last action {:?}, {} consecutive)",
                    symbol,
                    state.last_action,
                    state.consecutive_trades
                );
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, symbol: &str, state: &TradeState) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(state)?;
        conn.set::<_, _, ()>(state_key(symbol), json).await?;

        tracing::debug!("Checkpointed trade state for {}", symbol);
        Ok(())
    }

    async fn clear(&self, symbol: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(state_key(symbol)).await?;
        Ok(())
    }
}

/// In-process store, state is lost with the process
#[derive(Default)]
pub struct MemoryTradeStateStore {
    states: RwLock<HashMap<String, TradeState>>,
}

impl MemoryTradeStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStateStore for MemoryTradeStateStore {
    async fn load(&self, symbol: &str) -> Result<Option<TradeState>> {
        Ok(self.states.read().await.get(symbol).cloned())
    }

    async fn save(&self, symbol: &str, state: &TradeState) -> Result<()> {
        self.states
            .write()
            .await
            .insert(symbol.to_string(), state.clone());
        Ok(())
    }

    async fn clear(&self, symbol: &str) -> Result<()> {
        self.states.write().await.remove(symbol);
        Ok(())
    }
}
