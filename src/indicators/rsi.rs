/// Relative Strength Index with Wilder's smoothing.
///
/// RSI > 70 is commonly read as overbought, RSI < 30 as oversold. Output
/// is aligned with the input: the first `period` values are NaN (one price
/// change is consumed before averaging starts).
///
/// A perfectly flat market (zero average gain and zero average loss) is
/// defined as RSI 50: momentum is neutral, not overbought.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; prices.len()];
    if period == 0 || prices.len() < period + 1 {
        return out;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain: f64 = changes[..period]
        .iter()
        .filter(|&&c| c > 0.0)
        .sum::<f64>()
        / period as f64;
    let mut avg_loss: f64 = changes[..period]
        .iter()
        .filter(|&&c| c < 0.0)
        .map(|c| c.abs())
        .sum::<f64>()
        / period as f64;

    out[period] = rsi_value(avg_gain, avg_loss);

    // Wilder's smoothing for subsequent values
    for i in period..changes.len() {
        let gain = changes[i].max(0.0);
        let loss = (-changes[i]).max(0.0);

        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;

        out[i + 1] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_shape() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];

        let rsi = rsi_series(&prices, 14);
        assert_eq!(rsi.len(), prices.len());
        assert!(rsi[..14].iter().all(|v| v.is_nan()));

        let value = rsi[14];
        assert!(value > 0.0 && value < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = rsi_series(&prices, 14);
        assert!(rsi.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = rsi_series(&prices, 5);
        assert_eq!(rsi[5], 100.0);
    }

    #[test]
    fn test_rsi_flat_market_is_neutral() {
        let prices = vec![100.0; 30];
        let rsi = rsi_series(&prices, 14);
        assert_eq!(rsi[29], 50.0);
    }
}
