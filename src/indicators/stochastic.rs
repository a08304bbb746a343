use super::moving_average::sma_series;

/// Stochastic oscillator (%K / %D) over high/low/close.
///
/// Raw %K compares the close to the highest high / lowest low of the last
/// `fastk` bars; slow %K smooths it with an SMA(`slowk`), and %D is an
/// SMA(`slowd`) of slow %K. Values are in [0, 100] once warm. A window
/// with zero high-low range yields NaN, which downstream voting treats as
/// "condition false".
pub fn stochastic_series(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    fastk: usize,
    slowk: usize,
    slowd: usize,
) -> (Vec<f64>, Vec<f64>) {
    let len = closes.len();
    let mut raw_k = vec![f64::NAN; len];

    if fastk == 0 || len < fastk {
        return (raw_k.clone(), raw_k);
    }

    for i in (fastk - 1)..len {
        let window = i + 1 - fastk..=i;
        let highest = highs[window.clone()]
            .iter()
            .fold(f64::MIN, |max, &h| max.max(h));
        let lowest = lows[window].iter().fold(f64::MAX, |min, &l| min.min(l));

        let range = highest - lowest;
        if range > 0.0 {
            raw_k[i] = 100.0 * (closes[i] - lowest) / range;
        }
    }

    let stoch_k = smooth_tail(&raw_k, slowk);
    let stoch_d = smooth_tail(&stoch_k, slowd);

    (stoch_k, stoch_d)
}

/// SMA over the finite tail of a series, keeping the NaN prefix aligned.
fn smooth_tail(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if let Some(first_finite) = values.iter().position(|v| v.is_finite()) {
        let tail = sma_series(&values[first_finite..], period);
        for (i, value) in tail.into_iter().enumerate() {
            out[first_finite + i] = value;
        }
    }
    out
}
