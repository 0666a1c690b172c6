// Order execution module
pub mod executor;
pub mod paper;

pub use executor::OrderExecutor;
pub use paper::PaperGateway;
