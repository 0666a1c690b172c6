use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::session::{SessionSpec, SessionState, SessionStatus, StatusEvent, TradingSession};
use crate::api::{MarketDataProvider, OrderGateway};
use crate::error::TradingError;
use crate::persistence::TradeStateStore;
use crate::Result;

const EVENT_CAPACITY: usize = 64;

/// Identifies one started session
///
/// A handle outlives its session: once the symbol is restarted the old handle
/// no longer matches and every operation on it is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub id: Uuid,
    pub symbol: String,
}

struct SessionEntry {
    id: Uuid,
    stop_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<SessionStatus>,
    events: broadcast::Sender<StatusEvent>,
    task: Option<JoinHandle<()>>,
}

impl SessionEntry {
    fn is_active(&self) -> bool {
        match &self.task {
            Some(task) => !task.is_finished(),
            // Someone is awaiting the task; active until the loop reports Stopped
            None => self.status_rx.borrow().state == SessionState::Running,
        }
    }

    fn handle(&self, symbol: &str) -> SessionHandle {
        SessionHandle {
            id: self.id,
            symbol: symbol.to_string(),
        }
    }
}

/// At most one running session per symbol
///
/// Cloneable; clones share the same sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    feed: Arc<dyn MarketDataProvider>,
    gateway: Arc<dyn OrderGateway>,
    store: Option<Arc<dyn TradeStateStore>>,
}

impl SessionRegistry {
    pub fn new(feed: Arc<dyn MarketDataProvider>, gateway: Arc<dyn OrderGateway>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            feed,
            gateway,
            store: None,
        }
    }

    /// Checkpoint trade state of every session started from now on
    pub fn with_store(mut self, store: Arc<dyn TradeStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate `spec` and spawn its polling loop
    pub async fn start(&self, spec: SessionSpec) -> Result<SessionHandle> {
        let (handle, _) = self.start_and_subscribe(spec).await?;
        Ok(handle)
    }

    /// Like `start`, with an event receiver that sees the very first cycle
    pub async fn start_and_subscribe(
        &self,
        spec: SessionSpec,
    ) -> Result<(SessionHandle, broadcast::Receiver<StatusEvent>)> {
        spec.validate()?;

        let mut sessions = self.sessions.lock().await;

        if sessions.get(&spec.symbol).is_some_and(SessionEntry::is_active) {
            return Err(TradingError::AlreadyRunning(spec.symbol));
        }

        let symbol = spec.symbol.clone();
        let id = Uuid::new_v4();

        let (stop_tx, stop_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SessionStatus::new(&symbol));
        let (events, receiver) = broadcast::channel(EVENT_CAPACITY);

        let session = TradingSession::new(
            spec,
            self.feed.clone(),
            self.gateway.clone(),
            self.store.clone(),
        );
        let task = tokio::spawn(session.run(stop_rx, status_tx, events.clone()));

        sessions.insert(
            symbol.clone(),
            SessionEntry {
                id,
                stop_tx,
                status_rx,
                events,
                task: Some(task),
            },
        );

        tracing::info!("✅ Started session {} ({})", symbol, id);
        Ok((SessionHandle { id, symbol }, receiver))
    }

    /// Ask the session to stop at its next cycle boundary
    ///
    /// Idempotent; a stale handle is ignored.
    pub async fn stop(&self, handle: &SessionHandle) {
        let sessions = self.sessions.lock().await;

        match sessions.get(&handle.symbol) {
            Some(entry) if entry.id == handle.id => {
                if !entry.stop_tx.send_replace(true) {
                    tracing::info!("⏹  Stop requested for {}", handle.symbol);
                }
            }
            _ => tracing::debug!("Ignoring stop for stale session {}", handle.id),
        }
    }

    /// Stop the session and wait for its current cycle to finish
    pub async fn stop_and_wait(&self, handle: &SessionHandle) {
        let task = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&handle.symbol) {
                Some(entry) if entry.id == handle.id => {
                    entry.stop_tx.send_replace(true);
                    entry.task.take()
                }
                _ => None,
            }
        };

        let Some(task) = task else {
            return;
        };

        if let Err(e) = task.await {
            tracing::error!("Session {} ended abnormally: {}", handle.symbol, e);
        }

        let mut sessions = self.sessions.lock().await;
        if sessions.get(&handle.symbol).is_some_and(|entry| entry.id == handle.id) {
            sessions.remove(&handle.symbol);
        }
    }

    /// Latest status snapshot, `None` for a stale or unknown handle
    pub async fn status(&self, handle: &SessionHandle) -> Option<SessionStatus> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&handle.symbol)
            .filter(|entry| entry.id == handle.id)
            .map(|entry| entry.status_rx.borrow().clone())
    }

    /// Per-cycle events from now on
    pub async fn subscribe(&self, handle: &SessionHandle) -> Option<broadcast::Receiver<StatusEvent>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&handle.symbol)
            .filter(|entry| entry.id == handle.id)
            .map(|entry| entry.events.subscribe())
    }

    /// Handles of every session that has not been reaped yet
    pub async fn handles(&self) -> Vec<SessionHandle> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|(symbol, entry)| entry.handle(symbol))
            .collect()
    }

    pub async fn stop_all(&self) {
        for handle in self.handles().await {
            self.stop_and_wait(&handle).await;
        }
    }
}
