/// Rolling volatility - sample standard deviation of close
///
/// Each row uses up to `window` trailing closes and is defined once
/// `min_periods` samples exist. Undefined leading rows are back-filled
/// with the first defined value; a series too short to define any row is 0.
pub fn volatility_series(prices: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = min_periods.clamp(2, window.max(2));

    let mut out: Vec<Option<f64>> = Vec::with_capacity(prices.len());

    for i in 0..prices.len() {
        let start = (i + 1).saturating_sub(window);
        let sample = &prices[start..=i];

        if sample.len() < min_periods {
            out.push(None);
            continue;
        }

        out.push(Some(sample_std_dev(sample)));
    }

    let first_valid = out.iter().flatten().next().copied().unwrap_or(0.0);

    out.into_iter()
        .map(|value| value.unwrap_or(first_valid))
        .collect()
}

fn sample_std_dev(sample: &[f64]) -> f64 {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

    // Rounding can leave a tiny negative variance on flat windows
    variance.max(0.0).sqrt()
}
