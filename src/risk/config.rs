use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::Result;

/// Risk parameters for sizing and protecting orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub slippage_pct: f64,           // limit price offset toward the fill
    pub max_volatility_fraction: f64, // volatility / price that halves the size
    pub min_qty: f64,                // venue lot-size floor
    pub qty_step: f64,               // venue lot step, 0 disables stepping
    pub price_precision: u32,        // decimals accepted by the venue
    pub qty_precision: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.02,          // -2% stop
            take_profit_pct: 0.03,        // +3% target
            slippage_pct: 0.001,          // 0.1% buffer
            max_volatility_fraction: 0.02,
            min_qty: 0.1,
            qty_step: 0.1,
            price_precision: 4,
            qty_precision: 4,
        }
    }
}

impl RiskConfig {
    /// Reject parameters that would make every order meaningless
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("slippage_pct", self.slippage_pct),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(TradingError::Configuration(format!(
                    "{} must be in [0, 1), got {}",
                    name, value
                )));
            }
        }

        if !self.max_volatility_fraction.is_finite() || self.max_volatility_fraction <= 0.0 {
            return Err(TradingError::Configuration(format!(
                "max_volatility_fraction must be positive, got {}",
                self.max_volatility_fraction
            )));
        }

        if !self.min_qty.is_finite() || self.min_qty <= 0.0 {
            return Err(TradingError::Configuration(format!(
                "min_qty must be positive, got {}",
                self.min_qty
            )));
        }

        if !self.qty_step.is_finite() || self.qty_step < 0.0 {
            return Err(TradingError::Configuration(format!(
                "qty_step must be non-negative, got {}",
                self.qty_step
            )));
        }

        if self.price_precision > 12 || self.qty_precision > 12 {
            return Err(TradingError::Configuration(
                "precision must be at most 12 decimals".to_string(),
            ));
        }

        Ok(())
    }
}
