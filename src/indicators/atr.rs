/// Average True Range with Wilder's smoothing.
///
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The first ATR value (at index `period`) is the simple average of the
/// first `period` true ranges; earlier positions are NaN.
pub fn atr_series(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let len = closes.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < period + 1 {
        return out;
    }

    let mut true_ranges = Vec::with_capacity(len - 1);
    for i in 1..len {
        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
        true_ranges.push(tr);
    }

    let mut atr: f64 = true_ranges[..period].iter().sum::<f64>() / period as f64;
    out[period] = atr;

    for i in period..true_ranges.len() {
        atr = (atr * (period as f64 - 1.0) + true_ranges[i]) / period as f64;
        out[i + 1] = atr;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_low_volatility() {
        let n = 20;
        let highs = vec![101.0; n];
        let lows = vec![99.0; n];
        let closes = vec![100.0; n];

        let atr = atr_series(&highs, &lows, &closes, 14);

        assert!(atr[..14].iter().all(|v| v.is_nan()));
        // Constant 2-point range
        assert!((atr[14] - 2.0).abs() < 1e-9);
        assert!((atr[19] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_atr_high_volatility() {
        let n = 20;
        let highs: Vec<f64> = (0..n).map(|i| 110.0 + (i % 4) as f64 * 5.0).collect();
        let lows: Vec<f64> = (0..n).map(|i| 90.0 - (i % 3) as f64 * 5.0).collect();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i % 5) as f64 * 3.0).collect();

        let atr = atr_series(&highs, &lows, &closes, 14);
        assert!(atr[19] > 10.0);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let highs = vec![101.0, 101.0];
        let lows = vec![99.0, 99.0];
        let closes = vec![100.0, 100.0];

        let atr = atr_series(&highs, &lows, &closes, 14);
        assert!(atr.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_atr_gap_counts_in_true_range() {
        // A gap up makes |high - prev_close| the dominant term
        let highs = vec![101.0, 101.0, 101.0, 120.0];
        let lows = vec![99.0, 99.0, 99.0, 118.0];
        let closes = vec![100.0, 100.0, 100.0, 119.0];

        let atr = atr_series(&highs, &lows, &closes, 3);
        // TRs: 2, 2, 20 -> first ATR = 8
        assert!((atr[3] - 8.0).abs() < 1e-9);
    }
}
