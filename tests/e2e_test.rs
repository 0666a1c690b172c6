use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autotrader::api::MarketDataProvider;
use autotrader::execution::PaperGateway;
use autotrader::persistence::{MemoryTradeStateStore, TradeStateStore};
use autotrader::risk::RiskConfig;
use autotrader::scheduler::{SessionRegistry, SessionSpec, SessionState, StatusEvent};
use autotrader::strategy::SignalConfig;
use autotrader::*;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Replays scripted fetch results in order; the last one repeats forever
struct ScriptedFeed {
    delay: Duration,
    fetches: AtomicUsize,
    script: Mutex<VecDeque<Result<Vec<RawCandle>>>>,
}

impl ScriptedFeed {
    fn new(script: Vec<Result<Vec<RawCandle>>>) -> Self {
        Self {
            delay: Duration::from_millis(30),
            fetches: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedFeed {
    async fn fetch_candles(&self, _: &str, _: &str, _: usize) -> Result<Vec<RawCandle>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            return script.pop_front().unwrap();
        }
        match script.front() {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(e)) => Err(TradingError::Feed(e.to_string())),
            None => Err(TradingError::Feed("empty script".to_string())),
        }
    }
}

/// Steadily rising market, oldest first
fn uptrend(n: usize) -> Vec<RawCandle> {
    (0..n)
        .map(|i| {
            let close = 10.0 + i as f64 * 0.1;
            vec![
                (1_700_000_000_000i64 + i as i64 * 900_000).to_string(),
                format!("{:.4}", close - 0.05),
                format!("{:.4}", close + 0.1),
                format!("{:.4}", close - 0.1),
                format!("{:.4}", close),
                "1000".to_string(),
                format!("{:.4}", close * 1000.0),
            ]
        })
        .collect()
}

fn spec(symbol: &str) -> SessionSpec {
    SessionSpec {
        symbol: symbol.to_string(),
        interval: "15".to_string(),
        base_qty: 1.0,
        poll_interval: Duration::from_millis(10),
        candle_window: 200,
        risk: RiskConfig::default(),
        // Every RSI counts as oversold, so the uptrend buys
        signal: SignalConfig {
            rsi_oversold: 101.0,
            ..Default::default()
        },
    }
}

async fn next_events(events: &mut broadcast::Receiver<StatusEvent>, n: usize) -> Vec<StatusEvent> {
    let mut collected = Vec::with_capacity(n);
    while collected.len() < n {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a cycle")
            .expect("event channel closed");
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn test_cycle_failure_is_contained() {
    let _ = tracing_subscriber::fmt::try_init();

    let feed = Arc::new(ScriptedFeed::new(vec![
        Ok(uptrend(60)),
        Ok(uptrend(60)),
        Err(TradingError::Feed("connection reset".to_string())),
        Ok(uptrend(60)),
    ]));
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1.0));
    let registry = SessionRegistry::new(feed, gateway.clone());

    let handle = registry.start(spec("SUIUSDT")).await.unwrap();
    let mut events = registry.subscribe(&handle).await.unwrap();

    let cycles = next_events(&mut events, 5).await;

    // 1: buy placed
    assert_eq!(cycles[0].signal, Some(Signal::Buy));
    assert!(cycles[0].order.is_some());
    assert_eq!(cycles[0].status.last_action, Some(Side::Buy));
    assert_eq!(cycles[0].status.consecutive_trades, 1);

    // 2: same direction is debounced, the counter cools down
    assert_eq!(cycles[1].signal, Some(Signal::Hold));
    assert_eq!(cycles[1].status.consecutive_trades, 0);
    assert!(cycles[1].status.last_error.is_none());

    // 3: feed failure, state and market values from cycle 2 survive
    assert_eq!(cycles[2].signal, None);
    assert!(cycles[2].status.last_error.as_deref().unwrap().contains("connection reset"));
    assert_eq!(cycles[2].status.last_action, cycles[1].status.last_action);
    assert_eq!(cycles[2].status.consecutive_trades, cycles[1].status.consecutive_trades);
    assert_eq!(cycles[2].status.last_price, cycles[1].status.last_price);

    // 4 and 5: the loop carries on and clears the error
    for event in &cycles[3..] {
        assert_eq!(event.signal, Some(Signal::Hold));
        assert!(event.status.last_error.is_none());
        assert_eq!(event.status.last_action, Some(Side::Buy));
        assert_eq!(event.status.consecutive_trades, 0);
    }
    assert_eq!(cycles[4].status.cycles, 5);

    let status = registry.status(&handle).await.unwrap();
    assert_eq!(status.state, SessionState::Running);

    registry.stop_and_wait(&handle).await;
    assert_eq!(gateway.submitted().len(), 1);
}

#[tokio::test]
async fn test_rejected_order_does_not_advance_state() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(uptrend(60))]));
    // Minimum notional no order can reach
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1_000_000.0));
    let registry = SessionRegistry::new(feed, gateway.clone());

    let handle = registry.start(spec("SUIUSDT")).await.unwrap();
    let mut events = registry.subscribe(&handle).await.unwrap();

    for event in next_events(&mut events, 2).await {
        assert_eq!(event.signal, None);
        assert!(event.order.is_none());
        assert!(event.status.last_error.as_deref().unwrap().contains("notional"));
        assert_eq!(event.status.last_action, None);
        assert_eq!(event.status.consecutive_trades, 0);
    }

    registry.stop_and_wait(&handle).await;
    assert!(gateway.submitted().is_empty());
}

#[tokio::test]
async fn test_one_session_per_symbol() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(uptrend(60))]));
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1.0));
    let registry = SessionRegistry::new(feed, gateway);

    let handle = registry.start(spec("SUIUSDT")).await.unwrap();
    assert!(matches!(
        registry.start(spec("SUIUSDT")).await,
        Err(TradingError::AlreadyRunning(_))
    ));

    // Stop takes effect at the cycle boundary; the symbol stays taken until then
    registry.stop(&handle).await;
    registry.stop(&handle).await;
    registry.stop_and_wait(&handle).await;

    let restarted = registry.start(spec("SUIUSDT")).await.unwrap();
    assert_ne!(restarted.id, handle.id);
    assert!(registry.status(&handle).await.is_none());

    registry.stop_all().await;
    assert!(registry.handles().await.is_empty());
}

#[tokio::test]
async fn test_configuration_error_at_start() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(uptrend(60))]));
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1.0));
    let registry = SessionRegistry::new(feed, gateway);

    let mut bad = spec("SUIUSDT");
    bad.risk.stop_loss_pct = 1.5;

    let err = registry.start(bad).await.unwrap_err();
    assert!(matches!(err, TradingError::Configuration(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_checkpoint_survives_restart() {
    let store = Arc::new(MemoryTradeStateStore::new());
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(uptrend(60))]));
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1.0));
    let registry = SessionRegistry::new(feed, gateway.clone()).with_store(store.clone());

    let handle = registry.start(spec("SUIUSDT")).await.unwrap();
    let mut events = registry.subscribe(&handle).await.unwrap();
    next_events(&mut events, 1).await;
    registry.stop_and_wait(&handle).await;

    let saved = store.load("SUIUSDT").await.unwrap().unwrap();
    assert_eq!(saved.last_action, Some(Side::Buy));

    // The restarted session remembers the buy and does not repeat it
    let handle = registry.start(spec("SUIUSDT")).await.unwrap();
    let mut events = registry.subscribe(&handle).await.unwrap();
    let event = next_events(&mut events, 1).await.remove(0);
    assert_eq!(event.signal, Some(Signal::Hold));
    assert_eq!(event.status.last_action, Some(Side::Buy));

    registry.stop_and_wait(&handle).await;
    assert_eq!(gateway.submitted().len(), 1);
}

#[tokio::test]
async fn test_stop_lets_running_cycle_finish() {
    let feed = Arc::new(
        ScriptedFeed::new(vec![Ok(uptrend(60))]).with_delay(Duration::from_millis(200)),
    );
    let gateway = Arc::new(PaperGateway::new(1_000.0, 1_000.0, 1.0));
    let registry = SessionRegistry::new(feed.clone(), gateway.clone());

    let handle = registry.start(spec("SUIUSDT")).await.unwrap();

    // Stop while the first fetch is still in flight
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(feed.fetches(), 1);
    registry.stop_and_wait(&handle).await;

    // The cycle ran to its order, and no further cycle started
    assert_eq!(gateway.submitted().len(), 1);
    assert_eq!(feed.fetches(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(feed.fetches(), 1);
}
