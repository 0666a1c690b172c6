// Polling scheduler: one background loop per symbol, managed by the registry
pub mod registry;
pub mod session;

pub use registry::{SessionHandle, SessionRegistry};
pub use session::{
    CycleOutcome, SessionSpec, SessionState, SessionStatus, StatusEvent, TradingSession,
};
