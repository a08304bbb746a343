use super::moving_average::ema_series;

/// MACD line, signal line and histogram.
///
/// MACD = EMA(fast) - EMA(slow); signal = EMA(signal_period) of the MACD
/// line; histogram = MACD - signal. Warm-up positions are NaN: the MACD
/// line becomes finite at index `slow - 1`, the signal line
/// `signal_period - 1` bars later.
pub fn macd_series(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let len = prices.len();
    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();

    // The signal EMA runs over the finite tail of the MACD line; the
    // leading NaN prefix stays NaN.
    let mut signal = vec![f64::NAN; len];
    if let Some(first_finite) = macd.iter().position(|v| v.is_finite()) {
        let tail_signal = ema_series(&macd[first_finite..], signal_period);
        for (i, value) in tail_signal.into_iter().enumerate() {
            signal[first_finite + i] = value;
        }
    }

    let hist: Vec<f64> = macd
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| m - s)
        .collect();

    (macd, signal, hist)
}
