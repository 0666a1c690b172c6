// Risk management module
pub mod config;
pub mod sizing;
pub mod trade_state;

pub use config::RiskConfig;
pub use sizing::PositionSizer;
pub use trade_state::TradeState;
