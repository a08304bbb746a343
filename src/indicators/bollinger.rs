use super::moving_average::sma_series;

/// Bollinger Bands: SMA(period) middle band with upper/lower at
/// ±`num_dev` population standard deviations.
///
/// Returns (upper, middle, lower), each aligned with the input and NaN for
/// the first `period - 1` positions. A flat window has zero deviation, so
/// all three bands collapse onto the price.
pub fn bollinger_series(
    prices: &[f64],
    period: usize,
    num_dev: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let len = prices.len();
    let middle = sma_series(prices, period);
    let mut upper = vec![f64::NAN; len];
    let mut lower = vec![f64::NAN; len];

    if period == 0 || len < period {
        return (upper, middle, lower);
    }

    for i in (period - 1)..len {
        let window = &prices[i + 1 - period..=i];
        let mean = middle[i];
        let variance =
            window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
        let std_dev = variance.sqrt();

        upper[i] = mean + num_dev * std_dev;
        lower[i] = mean - num_dev * std_dev;
    }

    (upper, middle, lower)
}
