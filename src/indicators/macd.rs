use super::moving_average::ema_series;

/// Periods used by the standard MACD(12, 26, 9)
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// MACD line and its signal line for every row
///
/// MACD = EMA(fast) - EMA(slow), signal = EMA(signal) of MACD.
/// Both are 0.0 for every row while the series is shorter than `slow`.
pub fn macd_series(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>) {
    if prices.len() < slow {
        return (vec![0.0; prices.len()], vec![0.0; prices.len()]);
    }

    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&macd, signal);

    (macd, signal_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_zero() {
        let prices: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let (macd, signal) = macd_series(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        assert_eq!(macd.len(), 25);
        assert!(macd.iter().chain(signal.iter()).all(|&v| v == 0.0));
    }

    #[test]
    fn test_uptrend_macd_above_signal() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (macd, signal) = macd_series(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        let last = prices.len() - 1;
        assert!(macd[last] > 0.0);
        assert!(macd[last] > signal[last]);
    }

    #[test]
    fn test_downtrend_macd_below_signal() {
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let (macd, signal) = macd_series(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        let last = prices.len() - 1;
        assert!(macd[last] < 0.0);
        assert!(macd[last] < signal[last]);
    }

    #[test]
    fn test_flat_is_zero() {
        let prices = vec![50.0; 40];
        let (macd, signal) = macd_series(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        assert!(macd.iter().chain(signal.iter()).all(|&v| v.abs() < 1e-12));
    }
}
