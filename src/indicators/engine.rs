use crate::error::{BotError, Result};
use crate::models::{IndicatorSnapshot, PriceBar};

use super::atr::atr_series;
use super::bollinger::bollinger_series;
use super::macd::macd_series;
use super::moving_average::{ema_series, sma_series};
use super::rsi::rsi_series;
use super::stochastic::stochastic_series;

pub const EMA_PERIODS: [usize; 4] = [5, 10, 20, 200];
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const RSI_PERIOD: usize = 14;
pub const BB_PERIOD: usize = 20;
pub const BB_NUM_DEV: f64 = 2.0;
pub const STOCH_FASTK: usize = 14;
pub const STOCH_SLOWK: usize = 3;
pub const STOCH_SLOWD: usize = 3;
pub const VOLUME_SMA_PERIOD: usize = 20;
pub const ATR_PERIOD: usize = 14;

/// Compute the full indicator set for an ascending OHLCV series.
///
/// Pure transform: output has the same length and ordering as the input,
/// with NaN for warm-up positions. Persistence is the caller's job.
pub fn compute_indicators(bars: &[PriceBar]) -> Result<Vec<IndicatorSnapshot>> {
    if bars.is_empty() {
        return Err(BotError::DataUnavailable(
            "cannot compute indicators over an empty series".to_string(),
        ));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let ema_5 = ema_series(&closes, 5);
    let ema_10 = ema_series(&closes, 10);
    let ema_20 = ema_series(&closes, 20);
    let ema_200 = ema_series(&closes, 200);

    let (macd, macd_signal, macd_hist) =
        macd_series(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let rsi = rsi_series(&closes, RSI_PERIOD);
    let (bb_upper, bb_middle, bb_lower) = bollinger_series(&closes, BB_PERIOD, BB_NUM_DEV);
    let (stoch_k, stoch_d) =
        stochastic_series(&highs, &lows, &closes, STOCH_FASTK, STOCH_SLOWK, STOCH_SLOWD);
    let volume_sma = sma_series(&volumes, VOLUME_SMA_PERIOD);
    let atr = atr_series(&highs, &lows, &closes, ATR_PERIOD);

    let snapshots = (0..bars.len())
        .map(|i| IndicatorSnapshot {
            ema_5: ema_5[i],
            ema_10: ema_10[i],
            ema_20: ema_20[i],
            ema_200: ema_200[i],
            macd: macd[i],
            macd_signal: macd_signal[i],
            macd_hist: macd_hist[i],
            rsi: rsi[i],
            bb_upper: bb_upper[i],
            bb_middle: bb_middle[i],
            bb_lower: bb_lower[i],
            stoch_k: stoch_k[i],
            stoch_d: stoch_d[i],
            volume_sma: volume_sma[i],
            atr: atr[i],
        })
        .collect();

    Ok(snapshots)
}
