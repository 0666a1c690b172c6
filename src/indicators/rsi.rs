/// Neutral RSI reported when the value is undefined
pub const RSI_NEUTRAL: f64 = 50.0;

/// Relative Strength Index (RSI) for every row
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Each row averages the last `period` close-to-close gains and losses.
/// - Rows without `period` deltas of history are neutral (50)
/// - A flat window (no gains, no losses) is neutral (50)
/// - Otherwise a zero average loss is replaced by 1
///
/// A window of only losses yields 0.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = vec![RSI_NEUTRAL; prices.len()];

    if prices.len() < period + 1 {
        return out;
    }

    let mut gains = Vec::with_capacity(prices.len() - 1);
    let mut losses = Vec::with_capacity(prices.len() - 1);

    for window in prices.windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    // Delta j belongs to price row j + 1
    for row in period..prices.len() {
        let start = row - period;
        let avg_gain: f64 = gains[start..row].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[start..row].iter().sum::<f64>() / period as f64;

        out[row] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return RSI_NEUTRAL;
    }

    let avg_loss = if avg_loss == 0.0 { 1.0 } else { avg_loss };
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - (100.0 / (1.0 + rs));

    if rsi.is_finite() {
        rsi.clamp(0.0, 100.0)
    } else {
        RSI_NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        // Test with known values
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];

        let rsi = rsi_series(&prices, 14);
        assert_eq!(rsi.len(), prices.len());

        let last = *rsi.last().unwrap();
        assert!(last > 50.0 && last < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data_is_neutral() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = rsi_series(&prices, 14);
        assert_eq!(rsi, vec![50.0, 50.0, 50.0]);
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        let prices = vec![100.0; 60];
        let rsi = rsi_series(&prices, 14);
        assert!(rsi.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let prices: Vec<f64> = (0..40).map(|i| 200.0 - i as f64 * 1.5).collect();
        let rsi = rsi_series(&prices, 14);

        assert_eq!(rsi[13], 50.0);
        assert!(rsi[14..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rsi_gains_without_losses() {
        // Loss floor of 1 keeps RS finite
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 3.0).collect();
        let rsi = rsi_series(&prices, 14);

        // avg_gain = 3, avg_loss -> 1, RS = 3
        assert!((rsi[19] - 75.0).abs() < 1e-9);
    }
}
