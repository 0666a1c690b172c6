use super::RiskConfig;

/// Largest fraction of the base quantity volatility may remove
const MAX_REDUCTION: f64 = 0.5;

/// Volatility-scaled order sizing
///
/// `qty = max(min_qty, base_qty * (1 - min(volatility / (price * max_vol_fraction), 0.5)))`,
/// floored to the lot step before the minimum is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    pub max_volatility_fraction: f64,
    pub min_qty: f64,
    pub qty_step: f64,
}

impl PositionSizer {
    pub fn new(max_volatility_fraction: f64, min_qty: f64, qty_step: f64) -> Self {
        Self {
            max_volatility_fraction,
            min_qty,
            qty_step,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            config.max_volatility_fraction,
            config.min_qty,
            config.qty_step,
        )
    }

    /// Order quantity for the current volatility and price
    pub fn size(&self, base_qty: f64, volatility: f64, price: f64) -> f64 {
        let reduction = self.reduction(volatility, price);
        let scaled = base_qty.max(0.0) * (1.0 - reduction);

        let stepped = if self.qty_step > 0.0 {
            // Epsilon absorbs binary representation error (0.3 / 0.1 = 2.9999...)
            (scaled / self.qty_step + 1e-9).floor() * self.qty_step
        } else {
            scaled
        };

        stepped.max(self.min_qty)
    }

    fn reduction(&self, volatility: f64, price: f64) -> f64 {
        let denominator = price * self.max_volatility_fraction;
        if denominator <= 0.0 {
            return MAX_REDUCTION;
        }

        let ratio = volatility.max(0.0) / denominator;
        if ratio.is_finite() {
            ratio.min(MAX_REDUCTION)
        } else {
            MAX_REDUCTION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(0.02, 0.1, 0.0)
    }

    #[test]
    fn test_no_volatility_keeps_base() {
        assert_eq!(sizer().size(2.0, 0.0, 100.0), 2.0);
    }

    #[test]
    fn test_volatility_scales_down() {
        // ratio = 1 / (100 * 0.02) = 0.5 -> capped reduction of half
        assert_eq!(sizer().size(2.0, 1.0, 100.0), 1.0);

        // ratio = 0.4 / 2 = 0.2
        let qty = sizer().size(2.0, 0.4, 100.0);
        assert!((qty - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_reduction_is_capped() {
        assert_eq!(sizer().size(2.0, 1_000.0, 100.0), 1.0);
    }

    #[test]
    fn test_never_below_minimum() {
        let sizer = sizer();
        for base in [0.0, 0.01, 0.05, 0.1, 1.0, 10.0] {
            for vol in [0.0, 0.5, 2.0, 50.0, f64::INFINITY] {
                let qty = sizer.size(base, vol, 100.0);
                assert!(qty >= 0.1, "base={} vol={} -> {}", base, vol, qty);
            }
        }
    }

    #[test]
    fn test_degenerate_price_uses_cap() {
        assert_eq!(sizer().size(4.0, 1.0, 0.0), 2.0);
    }

    #[test]
    fn test_lot_step_floors() {
        let sizer = PositionSizer::new(0.02, 0.1, 0.1);
        // 1.6 stays 1.6, 0.37 floors to 0.3
        assert!((sizer.size(2.0, 0.4, 100.0) - 1.6).abs() < 1e-9);
        assert!((sizer.size(0.37, 0.0, 100.0) - 0.3).abs() < 1e-9);
        // floors below the minimum, minimum wins
        assert_eq!(sizer.size(0.05, 0.0, 100.0), 0.1);
    }
}
