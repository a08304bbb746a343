/// Simple Moving Average over the full series.
///
/// Output has the same length as input; the first `period - 1` values are
/// NaN (insufficient lookback), never dropped.
pub fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }

    out
}

/// Exponential Moving Average over the full series.
///
/// Seeded with the SMA of the first `period` values, then the standard
/// recursive form with multiplier 2/(period+1). First `period - 1` values
/// are NaN.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;

    let mut ema = seed;
    for i in period..values.len() {
        ema = (values[i] - ema) * multiplier + ema;
        out[i] = ema;
    }

    out
}
