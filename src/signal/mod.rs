//! Signal voter: turns indicator snapshots into a ternary BUY/SELL/HOLD
//! signal through a weighted-threshold voting rule.

use crate::error::{BotError, Result};
use crate::models::{Crossover, IndicatorSnapshot, PriceBar, Signal, SignalRow, Trend};

/// Voting thresholds. These are configuration defaults, not fixed
/// behavior; the many variants of this strategy differ only in these
/// numbers.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    pub min_buy_votes: usize,
    pub min_sell_votes: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,
            min_buy_votes: 3,
            min_sell_votes: 3,
        }
    }
}

/// Outcome of voting on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub trend: Trend,
    pub ema_cross: Crossover,
    pub macd_cross: Crossover,
    pub signal: Signal,
}

/// NaN-safe greater-than: any NaN operand evaluates the condition to
/// false, never panics or propagates.
fn gt(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && a > b
}

fn ge(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && a >= b
}

fn lt(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && a < b
}

fn le(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && a <= b
}

/// One-bar crossover of a fast line over a slow line. Requires the
/// previous bar; warm-up NaNs yield `Crossover::None`.
fn detect_cross(fast: f64, slow: f64, prev_fast: f64, prev_slow: f64) -> Crossover {
    if gt(fast, slow) && le(prev_fast, prev_slow) {
        Crossover::Up
    } else if lt(fast, slow) && ge(prev_fast, prev_slow) {
        Crossover::Down
    } else {
        Crossover::None
    }
}

/// Vote on the current bar given the immediately preceding snapshot
/// (crossovers need one bar of lookback; `None` on the very first bar).
pub fn vote(
    bar: &PriceBar,
    cur: &IndicatorSnapshot,
    prev: Option<&IndicatorSnapshot>,
    config: &SignalConfig,
) -> Vote {
    let trend = if gt(bar.close, cur.ema_200) {
        Trend::Alta
    } else {
        Trend::Baixa
    };

    let (ema_cross, macd_cross) = match prev {
        Some(prev) => (
            detect_cross(cur.ema_5, cur.ema_10, prev.ema_5, prev.ema_10),
            detect_cross(cur.macd, cur.macd_signal, prev.macd, prev.macd_signal),
        ),
        None => (Crossover::None, Crossover::None),
    };

    let buy_conditions = [
        ema_cross == Crossover::Up,
        macd_cross == Crossover::Up,
        lt(cur.rsi, config.rsi_oversold),
        le(bar.close, cur.bb_lower),
        lt(cur.stoch_k, config.stoch_oversold),
    ];

    let sell_conditions = [
        ema_cross == Crossover::Down,
        macd_cross == Crossover::Down,
        gt(cur.rsi, config.rsi_overbought),
        ge(bar.close, cur.bb_upper),
        gt(cur.stoch_k, config.stoch_overbought),
    ];

    let buy_count = buy_conditions.iter().filter(|&&c| c).count();
    let sell_count = sell_conditions.iter().filter(|&&c| c).count();

    // Policy: BUY evidence is evaluated first and wins when both
    // thresholds are met on the same bar.
    let signal = if buy_count >= config.min_buy_votes {
        tracing::debug!(
            "BUY vote: ema={} macd={} rsi={} bb={} stoch={} ({}/{})",
            buy_conditions[0],
            buy_conditions[1],
            buy_conditions[2],
            buy_conditions[3],
            buy_conditions[4],
            buy_count,
            config.min_buy_votes
        );
        Signal::Buy
    } else if sell_count >= config.min_sell_votes {
        tracing::debug!(
            "SELL vote: ema={} macd={} rsi={} bb={} stoch={} ({}/{})",
            sell_conditions[0],
            sell_conditions[1],
            sell_conditions[2],
            sell_conditions[3],
            sell_conditions[4],
            sell_count,
            config.min_sell_votes
        );
        Signal::Sell
    } else {
        Signal::Hold
    };

    Vote {
        trend,
        ema_cross,
        macd_cross,
        signal,
    }
}

/// Vote over a whole series, producing the rows persisted for audit.
/// Position mirrors the signal; both stay inside their three-value
/// domains by construction.
pub fn generate_signals(
    bars: &[PriceBar],
    snapshots: &[IndicatorSnapshot],
    config: &SignalConfig,
) -> Result<Vec<SignalRow>> {
    if bars.len() != snapshots.len() {
        return Err(BotError::Validation(format!(
            "bar/indicator length mismatch: {} vs {}",
            bars.len(),
            snapshots.len()
        )));
    }

    let rows = bars
        .iter()
        .zip(snapshots.iter())
        .enumerate()
        .map(|(i, (bar, cur))| {
            let prev = i.checked_sub(1).map(|p| &snapshots[p]);
            let vote = vote(bar, cur, prev, config);

            SignalRow {
                bar: bar.clone(),
                indicators: cur.clone(),
                trend: vote.trend,
                ema_cross: vote.ema_cross,
                macd_cross: vote.macd_cross,
                signal: vote.signal,
                position: match vote.signal {
                    Signal::Buy => crate::models::Position::Long,
                    Signal::Sell => crate::models::Position::Short,
                    Signal::Hold => crate::models::Position::Flat,
                },
            }
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_5: 100.0,
            ema_10: 100.0,
            ema_20: 100.0,
            ema_200: 100.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_hist: 0.0,
            rsi: 50.0,
            bb_upper: 105.0,
            bb_middle: 100.0,
            bb_lower: 95.0,
            stoch_k: 50.0,
            stoch_d: 50.0,
            volume_sma: 1000.0,
            atr: 1.0,
        }
    }

    #[test]
    fn test_neutral_snapshot_holds() {
        let vote = vote(&bar(100.0), &snapshot(), Some(&snapshot()), &SignalConfig::default());
        assert_eq!(vote.signal, Signal::Hold);
        assert_eq!(vote.ema_cross, Crossover::None);
        assert_eq!(vote.macd_cross, Crossover::None);
    }

    #[test]
    fn test_trend_from_ema_200() {
        let mut cur = snapshot();
        cur.ema_200 = 90.0;
        let v = vote(&bar(100.0), &cur, None, &SignalConfig::default());
        assert_eq!(v.trend, Trend::Alta);

        cur.ema_200 = 110.0;
        let v = vote(&bar(100.0), &cur, None, &SignalConfig::default());
        assert_eq!(v.trend, Trend::Baixa);

        // NaN comparison is false, so an unwarmed EMA-200 reads as baixa
        cur.ema_200 = f64::NAN;
        let v = vote(&bar(100.0), &cur, None, &SignalConfig::default());
        assert_eq!(v.trend, Trend::Baixa);
    }

    #[test]
    fn test_ema_crossover_detection() {
        let mut prev = snapshot();
        prev.ema_5 = 99.0;
        prev.ema_10 = 100.0;

        let mut cur = snapshot();
        cur.ema_5 = 101.0;
        cur.ema_10 = 100.0;

        let v = vote(&bar(100.0), &cur, Some(&prev), &SignalConfig::default());
        assert_eq!(v.ema_cross, Crossover::Up);

        // Symmetric cross-down
        let v = vote(&bar(100.0), &prev, Some(&cur), &SignalConfig::default());
        assert_eq!(v.ema_cross, Crossover::Down);
    }

    #[test]
    fn test_three_votes_trigger_buy() {
        let mut prev = snapshot();
        prev.ema_5 = 99.0;
        prev.macd = -1.0;

        let mut cur = snapshot();
        cur.ema_5 = 101.0; // ema cross up
        cur.macd = 1.0; // macd cross up
        cur.rsi = 25.0; // oversold

        let v = vote(&bar(100.0), &cur, Some(&prev), &SignalConfig::default());
        assert_eq!(v.signal, Signal::Buy);
    }

    #[test]
    fn test_two_votes_hold() {
        let mut cur = snapshot();
        cur.rsi = 25.0; // oversold
        cur.stoch_k = 10.0; // oversold

        let v = vote(&bar(100.0), &cur, Some(&snapshot()), &SignalConfig::default());
        assert_eq!(v.signal, Signal::Hold);
    }

    #[test]
    fn test_sell_votes() {
        let mut cur = snapshot();
        cur.rsi = 80.0; // overbought
        cur.stoch_k = 90.0; // overbought

        // close at the upper band makes three
        let v = vote(&bar(105.0), &cur, Some(&snapshot()), &SignalConfig::default());
        assert_eq!(v.signal, Signal::Sell);
    }

    #[test]
    fn test_buy_wins_tie() {
        // Force both evidence sets past their thresholds with lowered
        // vote minimums: BUY is evaluated first and wins.
        let config = SignalConfig {
            min_buy_votes: 1,
            min_sell_votes: 1,
            ..Default::default()
        };

        let mut cur = snapshot();
        cur.rsi = 25.0; // buy evidence
        cur.stoch_k = 90.0; // sell evidence

        let v = vote(&bar(100.0), &cur, Some(&snapshot()), &config);
        assert_eq!(v.signal, Signal::Buy);
    }

    #[test]
    fn test_nan_operands_never_vote() {
        let cur = IndicatorSnapshot::empty();
        let prev = IndicatorSnapshot::empty();

        let v = vote(&bar(100.0), &cur, Some(&prev), &SignalConfig::default());
        assert_eq!(v.signal, Signal::Hold);
        assert_eq!(v.ema_cross, Crossover::None);
        assert_eq!(v.macd_cross, Crossover::None);
        assert_eq!(v.trend, Trend::Baixa);
    }

    #[test]
    fn test_generate_signals_domain_invariant() {
        let bars: Vec<PriceBar> = (0..30).map(|i| bar(100.0 + i as f64)).collect();
        let snapshots = vec![snapshot(); 30];

        let rows = generate_signals(&bars, &snapshots, &SignalConfig::default()).unwrap();
        assert_eq!(rows.len(), 30);
        for row in &rows {
            assert!([-1, 0, 1].contains(&row.signal.as_i8()));
            assert!([-1, 0, 1].contains(&row.ema_cross.as_i8()));
            assert!([-1, 0, 1].contains(&row.macd_cross.as_i8()));
            assert!([-1, 0, 1].contains(&row.position.as_i8()));
        }
    }

    #[test]
    fn test_position_mirrors_sell_signal() {
        // Three sell votes: overbought RSI, overbought stochastic, close
        // at the upper band
        let mut cur = snapshot();
        cur.rsi = 80.0;
        cur.stoch_k = 90.0;

        let rows =
            generate_signals(&[bar(105.0)], &[cur], &SignalConfig::default()).unwrap();
        assert_eq!(rows[0].signal, Signal::Sell);
        assert_eq!(rows[0].position, crate::models::Position::Short);
        assert_eq!(rows[0].position.as_i8(), rows[0].signal.as_i8());
    }

    #[test]
    fn test_generate_signals_length_mismatch() {
        let bars = vec![bar(100.0); 5];
        let snapshots = vec![snapshot(); 4];

        let result = generate_signals(&bars, &snapshots, &SignalConfig::default());
        assert!(matches!(result, Err(crate::error::BotError::Validation(_))));
    }
}
