use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::indicators::IndicatorSnapshot;
use crate::models::{Side, Signal};
use crate::risk::TradeState;
use crate::Result;

/// Which moving-average comparisons form the trend condition of one side
///
/// Buy requires `fast > slow` for every selected pair; Sell requires the
/// negation `!(fast > slow)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRule {
    pub sma: bool,  // SMA20 vs SMA50
    pub ema: bool,  // EMA20 vs EMA50
    pub macd: bool, // MACD vs signal line
}

impl TrendRule {
    /// SMA, EMA and MACD all aligned
    pub fn full() -> Self {
        Self {
            sma: true,
            ema: true,
            macd: true,
        }
    }

    /// SMA and EMA only, MACD ignored
    pub fn moving_averages() -> Self {
        Self {
            sma: true,
            ema: true,
            macd: false,
        }
    }

    fn aligned_up(&self, row: &IndicatorSnapshot) -> bool {
        (!self.sma || row.sma20 > row.sma50)
            && (!self.ema || row.ema20 > row.ema50)
            && (!self.macd || row.macd > row.macd_signal)
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    fn aligned_down(&self, row: &IndicatorSnapshot) -> bool {
        (!self.sma || !(row.sma20 > row.sma50))
            && (!self.ema || !(row.ema20 > row.ema50))
            && (!self.macd || !(row.macd > row.macd_signal))
    }
}

/// Configuration for signal generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_oversold: f64,   // RSI below this enables Buy
    pub rsi_overbought: f64, // RSI above this enables Sell
    pub max_consecutive: u32,
    pub require_volume_confirmation: bool, // volume > volume SMA20
    pub buy_trend: TrendRule,
    pub sell_trend: TrendRule,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            max_consecutive: 2,
            require_volume_confirmation: false,
            buy_trend: TrendRule::full(),
            sell_trend: TrendRule::moving_averages(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.rsi_oversold.is_finite() || !self.rsi_overbought.is_finite() {
            return Err(TradingError::Configuration(
                "RSI thresholds must be finite".to_string(),
            ));
        }

        if self.max_consecutive == 0 {
            return Err(TradingError::Configuration(
                "max_consecutive must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Decide Buy / Sell / Hold from the latest indicator row and trade memory
///
/// Pure: the caller applies the resulting state change (trade on a
/// confirmed order, cooldown on Hold).
pub fn evaluate_signal(
    row: &IndicatorSnapshot,
    state: &TradeState,
    config: &SignalConfig,
) -> Signal {
    let volume_confirmed = !config.require_volume_confirmation || row.volume > row.volume_sma20;

    let buy_trend = config.buy_trend.aligned_up(row);
    let buy_momentum = row.rsi < config.rsi_oversold;
    let buy_allowed = state.allows(Side::Buy, config.max_consecutive);

    if buy_trend && buy_momentum && volume_confirmed && buy_allowed {
        tracing::info!(
            "BUY conditions: trend↑={}, RSI<{}={} ({:.1}), Vol✓={}, debounce ok={}",
            buy_trend,
            config.rsi_oversold,
            buy_momentum,
            row.rsi,
            volume_confirmed,
            buy_allowed
        );
        return Signal::Buy;
    }

    let sell_trend = config.sell_trend.aligned_down(row);
    let sell_momentum = row.rsi > config.rsi_overbought;
    let sell_allowed = state.allows(Side::Sell, config.max_consecutive);

    if sell_trend && sell_momentum && volume_confirmed && sell_allowed {
        tracing::info!(
            "SELL conditions: trend↓={}, RSI>{}={} ({:.1}), Vol✓={}, debounce ok={}",
            sell_trend,
            config.rsi_overbought,
            sell_momentum,
            row.rsi,
            volume_confirmed,
            sell_allowed
        );
        return Signal::Sell;
    }

    tracing::debug!(
        "HOLD: buy trend={} rsi={} allowed={} | sell trend={} rsi={} allowed={} | vol={}",
        buy_trend,
        buy_momentum,
        buy_allowed,
        sell_trend,
        sell_momentum,
        sell_allowed,
        volume_confirmed
    );

    Signal::Hold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullish_oversold() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: 100.0,
            volume: 1500.0,
            sma20: 101.0,
            sma50: 99.0,
            ema20: 100.5,
            ema50: 99.5,
            rsi: 30.0,
            volatility: 1.2,
            volume_sma20: 1000.0,
            macd: 0.4,
            macd_signal: 0.2,
        }
    }

    fn bearish_overbought() -> IndicatorSnapshot {
        IndicatorSnapshot {
            sma20: 98.0,
            sma50: 100.0,
            ema20: 98.5,
            ema50: 99.5,
            rsi: 72.0,
            macd: 0.4, // ignored by the default sell rule
            macd_signal: 0.2,
            ..bullish_oversold()
        }
    }

    #[test]
    fn test_buy_when_all_conditions_hold() {
        let state = TradeState::new("SUIUSDT");
        let signal = evaluate_signal(&bullish_oversold(), &state, &SignalConfig::default());
        assert_eq!(signal, Signal::Buy);
    }

    #[test]
    fn test_buy_requires_macd_alignment() {
        let row = IndicatorSnapshot {
            macd: 0.1,
            macd_signal: 0.2,
            ..bullish_oversold()
        };
        let signal = evaluate_signal(&row, &TradeState::new("SUIUSDT"), &SignalConfig::default());
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_buy_requires_oversold_rsi() {
        let row = IndicatorSnapshot {
            rsi: 50.0,
            ..bullish_oversold()
        };
        let signal = evaluate_signal(&row, &TradeState::new("SUIUSDT"), &SignalConfig::default());
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_sell_ignores_macd_by_default() {
        let signal = evaluate_signal(
            &bearish_overbought(),
            &TradeState::new("SUIUSDT"),
            &SignalConfig::default(),
        );
        assert_eq!(signal, Signal::Sell);
    }

    #[test]
    fn test_equal_averages_count_as_not_rising() {
        let row = IndicatorSnapshot {
            sma20: 100.0,
            sma50: 100.0,
            ema20: 100.0,
            ema50: 100.0,
            rsi: 70.0,
            ..bullish_oversold()
        };
        let state = TradeState::new("SUIUSDT");
        assert_eq!(evaluate_signal(&row, &state, &SignalConfig::default()), Signal::Sell);

        // ...and never as rising
        let row = IndicatorSnapshot { rsi: 30.0, ..row };
        assert_eq!(evaluate_signal(&row, &state, &SignalConfig::default()), Signal::Hold);
    }

    #[test]
    fn test_sell_rule_can_require_macd() {
        let config = SignalConfig {
            sell_trend: TrendRule::full(),
            ..Default::default()
        };
        let signal = evaluate_signal(&bearish_overbought(), &TradeState::new("SUIUSDT"), &config);
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_same_direction_is_debounced() {
        let mut state = TradeState::new("SUIUSDT");
        state.record_trade(Side::Buy);

        let signal = evaluate_signal(&bullish_oversold(), &state, &SignalConfig::default());
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_counter_limit_blocks_until_hold() {
        let config = SignalConfig::default(); // max_consecutive = 2
        let mut state = TradeState::new("SUIUSDT");

        // Two consecutive trades
        state.record_trade(Side::Sell);
        state.record_trade(Side::Buy);
        state.last_action = Some(Side::Sell);
        assert_eq!(state.consecutive_trades, 2);

        // Qualifying buy is refused while the counter is exhausted
        assert_eq!(evaluate_signal(&bullish_oversold(), &state, &config), Signal::Hold);
        assert_eq!(state.consecutive_trades, 2);

        // The Hold cycle applies the cooldown, then buying is possible again
        state.record_hold();
        assert_eq!(evaluate_signal(&bullish_oversold(), &state, &config), Signal::Buy);
    }

    #[test]
    fn test_volume_confirmation() {
        let config = SignalConfig {
            require_volume_confirmation: true,
            ..Default::default()
        };
        let quiet = IndicatorSnapshot {
            volume: 800.0,
            ..bullish_oversold()
        };

        let state = TradeState::new("SUIUSDT");
        assert_eq!(evaluate_signal(&quiet, &state, &config), Signal::Hold);
        assert_eq!(evaluate_signal(&bullish_oversold(), &state, &config), Signal::Buy);
    }

    #[test]
    fn test_flat_market_holds() {
        let flat = IndicatorSnapshot {
            close: 25.0,
            volume: 1000.0,
            sma20: 25.0,
            sma50: 25.0,
            ema20: 25.0,
            ema50: 25.0,
            rsi: 50.0,
            volatility: 0.0,
            volume_sma20: 1000.0,
            macd: 0.0,
            macd_signal: 0.0,
        };
        let signal = evaluate_signal(&flat, &TradeState::new("SUIUSDT"), &SignalConfig::default());
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_zero_max_consecutive_rejected() {
        let config = SignalConfig {
            max_consecutive: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
