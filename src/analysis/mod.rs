//! Trend and risk analysis over recent indicator history.
//!
//! Coarser-grained than the per-bar trend flag: summarizes the last 20
//! bars into a qualitative label and a risk-scaling factor in [0.3, 1.0]
//! that dampens position size under high volatility.

use crate::models::SignalRow;

const TREND_WINDOW: usize = 20;
const STRONG_UP_THRESHOLD: f64 = 0.7;
const UP_THRESHOLD: f64 = 0.5;
const STRONG_DOWN_THRESHOLD: f64 = 0.3;
const DOWN_THRESHOLD: f64 = 0.5;

const HIGH_VOLATILITY: f64 = 0.02;
const ATR_SPIKE_RATIO: f64 = 1.5;
const MIN_RISK_FACTOR: f64 = 0.3;
const MAX_RISK_FACTOR: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendLabel {
    StrongUp,
    Up,
    Neutral,
    Down,
    StrongDown,
}

/// Share of the last 20 bars with ema_5 above ema_10, bucketed into a
/// label. The denominator is the fixed window even when fewer rows exist.
/// An exact 0.5 falls through both the > and < checks to Neutral.
pub fn analyze_trend(rows: &[SignalRow]) -> TrendLabel {
    let tail = &rows[rows.len().saturating_sub(TREND_WINDOW)..];
    let ups = tail
        .iter()
        .filter(|r| {
            r.indicators.ema_5.is_finite()
                && r.indicators.ema_10.is_finite()
                && r.indicators.ema_5 > r.indicators.ema_10
        })
        .count();
    let ratio = ups as f64 / TREND_WINDOW as f64;

    if ratio > STRONG_UP_THRESHOLD {
        TrendLabel::StrongUp
    } else if ratio > UP_THRESHOLD {
        TrendLabel::Up
    } else if ratio < STRONG_DOWN_THRESHOLD {
        TrendLabel::StrongDown
    } else if ratio < DOWN_THRESHOLD {
        TrendLabel::Down
    } else {
        TrendLabel::Neutral
    }
}

/// Risk factor from close volatility and the ATR level, clamped to
/// [0.3, 1.0]. NaN indicator values in early rows are skipped, never
/// propagated.
pub fn calculate_risk_factor(rows: &[SignalRow]) -> f64 {
    let mut risk_factor: f64 = 1.0;

    if let Some(volatility) = close_volatility(rows) {
        if volatility > HIGH_VOLATILITY {
            risk_factor *= 0.7;
        }
    }

    let atrs: Vec<f64> = rows
        .iter()
        .map(|r| r.indicators.atr)
        .filter(|a| a.is_finite())
        .collect();
    if !atrs.is_empty() {
        let atr_mean = atrs.iter().sum::<f64>() / atrs.len() as f64;
        let latest_atr = rows
            .last()
            .map(|r| r.indicators.atr)
            .unwrap_or(f64::NAN);
        if latest_atr.is_finite() && latest_atr > atr_mean * ATR_SPIKE_RATIO {
            risk_factor *= 0.8;
        }
    }

    risk_factor.clamp(MIN_RISK_FACTOR, MAX_RISK_FACTOR)
}

/// Sample standard deviation of close-to-close percent changes.
fn close_volatility(rows: &[SignalRow]) -> Option<f64> {
    let changes: Vec<f64> = rows
        .windows(2)
        .filter(|w| w[0].bar.close != 0.0)
        .map(|w| (w[1].bar.close - w[0].bar.close) / w[0].bar.close)
        .filter(|c| c.is_finite())
        .collect();

    if changes.len() < 2 {
        return None;
    }

    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>()
        / (changes.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Summarize the market: qualitative trend label plus risk factor.
/// Deterministic, no I/O.
pub fn analyze_market(rows: &[SignalRow]) -> (TrendLabel, f64) {
    (analyze_trend(rows), calculate_risk_factor(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Crossover, IndicatorSnapshot, Position, PriceBar, Signal, SignalRow, Trend,
    };
    use chrono::{Duration, TimeZone, Utc};

    fn row(i: usize, close: f64, ema_5: f64, ema_10: f64, atr: f64) -> SignalRow {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut indicators = IndicatorSnapshot::empty();
        indicators.ema_5 = ema_5;
        indicators.ema_10 = ema_10;
        indicators.atr = atr;

        SignalRow {
            bar: PriceBar {
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            },
            indicators,
            trend: Trend::Baixa,
            ema_cross: Crossover::None,
            macd_cross: Crossover::None,
            signal: Signal::Hold,
            position: Position::Flat,
        }
    }

    fn rows_with_up_count(ups: usize) -> Vec<SignalRow> {
        (0..20)
            .map(|i| {
                if i < ups {
                    row(i, 100.0, 101.0, 100.0, 1.0)
                } else {
                    row(i, 100.0, 99.0, 100.0, 1.0)
                }
            })
            .collect()
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(analyze_trend(&rows_with_up_count(16)), TrendLabel::StrongUp); // 0.8
        assert_eq!(analyze_trend(&rows_with_up_count(12)), TrendLabel::Up); // 0.6
        assert_eq!(analyze_trend(&rows_with_up_count(8)), TrendLabel::Down); // 0.4
        assert_eq!(analyze_trend(&rows_with_up_count(4)), TrendLabel::StrongDown); // 0.2
    }

    #[test]
    fn test_trend_exact_half_is_neutral() {
        // 10/20 passes neither the > 0.5 nor the < 0.5 branch
        assert_eq!(analyze_trend(&rows_with_up_count(10)), TrendLabel::Neutral);
    }

    #[test]
    fn test_risk_factor_calm_market() {
        let rows: Vec<SignalRow> = (0..30).map(|i| row(i, 100.0, 100.0, 100.0, 1.0)).collect();
        assert_eq!(calculate_risk_factor(&rows), 1.0);
    }

    #[test]
    fn test_risk_factor_high_volatility() {
        // Alternating ±5% moves: volatility well above 2%
        let rows: Vec<SignalRow> = (0..30)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 105.0 };
                row(i, close, 100.0, 100.0, 1.0)
            })
            .collect();

        let rf = calculate_risk_factor(&rows);
        assert!((rf - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_risk_factor_atr_spike() {
        let mut rows: Vec<SignalRow> =
            (0..29).map(|i| row(i, 100.0, 100.0, 100.0, 1.0)).collect();
        rows.push(row(29, 100.0, 100.0, 100.0, 10.0)); // latest ATR way above mean

        let rf = calculate_risk_factor(&rows);
        assert!((rf - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_risk_factor_bounds() {
        // Both penalties together stay within the clamp
        let mut rows: Vec<SignalRow> = (0..29)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 110.0 };
                row(i, close, 100.0, 100.0, 1.0)
            })
            .collect();
        rows.push(row(29, 100.0, 100.0, 100.0, 50.0));

        let rf = calculate_risk_factor(&rows);
        assert!(rf >= 0.3 && rf <= 1.0);
        assert!((rf - 0.56).abs() < 1e-9); // 0.7 * 0.8
    }

    #[test]
    fn test_analyzer_tolerates_nan_rows() {
        // Early rows with unwarmed (NaN) indicators must not poison the
        // result
        let mut rows: Vec<SignalRow> = (0..10)
            .map(|i| row(i, 100.0, f64::NAN, f64::NAN, f64::NAN))
            .collect();
        rows.extend((10..30).map(|i| row(i, 100.0, 101.0, 100.0, 1.0)));

        let (label, rf) = analyze_market(&rows);
        assert_eq!(label, TrendLabel::StrongUp);
        assert!(rf >= 0.3 && rf <= 1.0);
    }
}
