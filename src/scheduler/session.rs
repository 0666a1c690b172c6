use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;

use crate::api::{MarketDataProvider, OrderGateway};
use crate::config::{BotConfig, SessionConfig};
use crate::error::TradingError;
use crate::execution::OrderExecutor;
use crate::indicators::IndicatorSnapshot;
use crate::models::{CandleSeries, OrderAck, Side, Signal};
use crate::persistence::TradeStateStore;
use crate::risk::{PositionSizer, RiskConfig, TradeState};
use crate::strategy::{MomentumStrategy, SignalConfig, Strategy};
use crate::Result;

/// Everything one symbol loop needs, validated before the loop starts
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub symbol: String,
    pub interval: String,
    pub base_qty: f64,
    pub poll_interval: Duration,
    pub candle_window: usize,
    pub risk: RiskConfig,
    pub signal: SignalConfig,
}

impl SessionSpec {
    pub fn from_config(session: &SessionConfig, config: &BotConfig) -> Self {
        Self {
            symbol: session.symbol.clone(),
            interval: session.interval.clone(),
            base_qty: session.base_qty,
            poll_interval: Duration::from_secs(config.trading.poll_interval_secs),
            candle_window: config.trading.candle_window,
            risk: config.risk.clone(),
            signal: config.signal.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(TradingError::Configuration("symbol must not be empty".to_string()));
        }
        if self.interval.trim().is_empty() {
            return Err(TradingError::Configuration(format!(
                "{}: interval must not be empty",
                self.symbol
            )));
        }
        if !self.base_qty.is_finite() || self.base_qty <= 0.0 {
            return Err(TradingError::Configuration(format!(
                "{}: base_qty must be positive, got {}",
                self.symbol, self.base_qty
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(TradingError::Configuration(format!(
                "{}: poll interval must be positive",
                self.symbol
            )));
        }
        if self.candle_window == 0 {
            return Err(TradingError::Configuration(format!(
                "{}: candle_window must be positive",
                self.symbol
            )));
        }

        self.risk.validate()?;
        self.signal.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Running,
    Stopped,
}

/// Point-in-time view of a session for callers
///
/// Market values come from the last successful cycle. `last_error` is set by
/// a failed cycle and cleared by the next successful one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub symbol: String,
    pub state: SessionState,
    pub last_action: Option<Side>,
    pub consecutive_trades: u32,
    pub last_price: Option<f64>,
    pub last_rsi: Option<f64>,
    pub last_volatility: Option<f64>,
    pub cycles: u64,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            state: SessionState::Running,
            last_action: None,
            consecutive_trades: 0,
            last_price: None,
            last_rsi: None,
            last_volatility: None,
            cycles: 0,
            last_error: None,
            updated_at: None,
        }
    }
}

/// Emitted after every cycle, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub status: SessionStatus,
    pub signal: Option<Signal>,
    pub order: Option<OrderAck>,
}

/// Result of one successful fetch-to-execute pass
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub signal: Signal,
    pub snapshot: IndicatorSnapshot,
    pub order: Option<OrderAck>,
}

/// One cooperative polling loop for a single symbol
///
/// Owns the symbol's `TradeState`; nothing else mutates it.
pub struct TradingSession {
    spec: SessionSpec,
    feed: Arc<dyn MarketDataProvider>,
    executor: OrderExecutor,
    sizer: PositionSizer,
    strategy: Box<dyn Strategy>,
    store: Option<Arc<dyn TradeStateStore>>,
    state: TradeState,
    status: SessionStatus,
}

impl TradingSession {
    pub fn new(
        spec: SessionSpec,
        feed: Arc<dyn MarketDataProvider>,
        gateway: Arc<dyn OrderGateway>,
        store: Option<Arc<dyn TradeStateStore>>,
    ) -> Self {
        let executor = OrderExecutor::new(gateway, spec.risk.clone());
        let sizer = PositionSizer::from_config(&spec.risk);
        let strategy = Box::new(MomentumStrategy::new(spec.signal.clone()));
        let state = TradeState::new(&spec.symbol);
        let status = SessionStatus::new(&spec.symbol);

        Self {
            spec,
            feed,
            executor,
            sizer,
            strategy,
            store,
            state,
            status,
        }
    }

    pub fn state(&self) -> &TradeState {
        &self.state
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Replace the fresh state with the stored checkpoint, if any
    pub async fn restore(&mut self) {
        let Some(store) = &self.store else {
            return;
        };

        match store.load(&self.spec.symbol).await {
            Ok(Some(mut state)) => {
                state.current_symbol = Some(self.spec.symbol.clone());
                self.state = state;
            }
            Ok(None) => {
                tracing::info!("No checkpoint for {}, starting fresh", self.spec.symbol);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load checkpoint for {} ({}), starting fresh",
                    self.spec.symbol,
                    e
                );
            }
        }

        self.sync_state_into_status();
    }

    /// Fetch, compute, decide and (maybe) size and execute
    ///
    /// Any failure ends the cycle early and leaves the trade state as it was
    /// before the failing step.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let symbol = self.spec.symbol.clone();
        let before = self.state.clone();

        let rows = self
            .feed
            .fetch_candles(&symbol, &self.spec.interval, self.spec.candle_window)
            .await?;
        let series =
            CandleSeries::from_raw(&symbol, &self.spec.interval, &rows, self.spec.candle_window)?;

        if series.len() < self.strategy.warmup_candles() {
            tracing::debug!(
                "{} ({}): {} candles, indicators warm up after {}",
                symbol,
                series.interval(),
                series.len(),
                self.strategy.warmup_candles()
            );
        }

        let (signal, snapshot) = self.strategy.generate_signal(&series, &self.state)?;

        let order = match signal.side() {
            None => {
                self.state.record_hold();
                None
            }
            Some(side) => {
                let quantity = self
                    .sizer
                    .size(self.spec.base_qty, snapshot.volatility, snapshot.close);
                let (_, ack) = self
                    .executor
                    .execute(&mut self.state, &symbol, side, quantity, snapshot.close)
                    .await?;
                Some(ack)
            }
        };

        if self.state != before {
            self.checkpoint().await;
        }

        Ok(CycleOutcome {
            signal,
            snapshot,
            order,
        })
    }

    /// Drive cycles until the stop flag is raised
    ///
    /// The flag is read before each cycle and while sleeping, so a running
    /// cycle always completes.
    pub async fn run(
        mut self,
        mut stop_rx: watch::Receiver<bool>,
        status_tx: watch::Sender<SessionStatus>,
        events: broadcast::Sender<StatusEvent>,
    ) {
        tracing::info!(
            "💹 Session {} starting (interval {}, every {:?})",
            self.spec.symbol,
            self.spec.interval,
            self.spec.poll_interval
        );

        self.restore().await;
        status_tx.send_replace(self.status.clone());

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            tracing::info!(
                "💹 [{}] Tick at {}",
                self.spec.symbol,
                Utc::now().format("%H:%M:%S")
            );

            let (signal, order) = match self.run_cycle().await {
                Ok(outcome) => {
                    self.status.last_price = Some(outcome.snapshot.close);
                    self.status.last_rsi = Some(outcome.snapshot.rsi);
                    self.status.last_volatility = Some(outcome.snapshot.volatility);
                    self.status.last_error = None;
                    (Some(outcome.signal), outcome.order)
                }
                Err(e) => {
                    if e.is_recoverable() {
                        tracing::warn!("  ✗ {} cycle failed: {}", self.spec.symbol, e);
                    } else {
                        tracing::error!("  ✗ {} cycle failed (not recoverable): {}", self.spec.symbol, e);
                    }
                    self.status.last_error = Some(e.to_string());
                    (None, None)
                }
            };

            self.status.cycles += 1;
            self.sync_state_into_status();
            status_tx.send_replace(self.status.clone());

            // No subscribers is fine
            let _ = events.send(StatusEvent {
                status: self.status.clone(),
                signal,
                order,
            });

            tokio::select! {
                _ = sleep(self.spec.poll_interval) => {}
                changed = stop_rx.changed() => {
                    // Registry dropped the sender: nobody can stop us any more
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.status.state = SessionState::Stopped;
        self.status.updated_at = Some(Utc::now());
        status_tx.send_replace(self.status.clone());

        tracing::info!(
            "👋 Session {} stopped after {} cycles",
            self.spec.symbol,
            self.status.cycles
        );
    }

    async fn checkpoint(&self) {
        let Some(store) = &self.store else {
            return;
        };

        if let Err(e) = store.save(&self.spec.symbol, &self.state).await {
            tracing::warn!("Failed to checkpoint {}: {}", self.spec.symbol, e);
        }
    }

    fn sync_state_into_status(&mut self) {
        self.status.last_action = self.state.last_action;
        self.status.consecutive_trades = self.state.consecutive_trades;
        self.status.updated_at = Some(Utc::now());
    }
}
