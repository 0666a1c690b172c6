/// Simple Moving Average (SMA) for every row
///
/// Rows before `period` values exist average over everything available
/// (minimum one period), so early rows are usable rather than empty.
pub fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        let count = (i + 1).min(period);
        out.push(sum / count as f64);
    }

    out
}

/// Exponential Moving Average (EMA) for every row
///
/// Smoothing factor 2/(period+1), seeded with the first value.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let multiplier = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());

    let mut ema = match values.first() {
        Some(&first) => first,
        None => return out,
    };

    for value in values {
        ema = (value - ema) * multiplier + ema;
        out.push(ema);
    }

    out
}
