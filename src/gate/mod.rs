//! Trade gate: pre-conditions that must hold before the decision engine
//! may act this cycle. A rejected gate only suppresses the decision; the
//! price/indicator history still updates.

use chrono::NaiveDate;

use crate::models::TradeHistory;

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub max_daily_trades: usize,
    /// Relative price jump against the previous cycle that trips the
    /// volatility circuit breaker.
    pub max_price_move: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_daily_trades: 100,
            max_price_move: 0.1,
        }
    }
}

/// Check both gate rules. They are independent: either one rejecting
/// blocks the cycle's trade action.
pub fn allow_trade(
    current_price: f64,
    last_price: Option<f64>,
    history: &TradeHistory,
    today: NaiveDate,
    config: &GateConfig,
) -> bool {
    if history.count_on(today) >= config.max_daily_trades {
        tracing::warn!(
            "daily trade cap reached ({} trades), blocking this cycle",
            config.max_daily_trades
        );
        return false;
    }

    if let Some(last) = last_price {
        if last > 0.0 {
            let jump = ((current_price - last) / last).abs();
            if jump > config.max_price_move {
                tracing::warn!(
                    "extreme volatility: price moved {:.1}% since last cycle, blocking",
                    jump * 100.0
                );
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderSide, TradeRecord};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn history_with_trades_today(count: usize) -> (TradeHistory, NaiveDate) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let trades = (0..count)
            .map(|_| TradeRecord {
                id: Uuid::new_v4(),
                timestamp: now,
                side: OrderSide::Buy,
                price: 100.0,
                volume: 1.0,
            })
            .collect();
        (TradeHistory::new(trades), now.date_naive())
    }

    #[test]
    fn test_allows_normal_conditions() {
        let (history, today) = history_with_trades_today(3);
        assert!(allow_trade(
            100.0,
            Some(99.0),
            &history,
            today,
            &GateConfig::default()
        ));
    }

    #[test]
    fn test_daily_cap_blocks_regardless_of_price() {
        let config = GateConfig {
            max_daily_trades: 5,
            ..Default::default()
        };
        let (history, today) = history_with_trades_today(5);

        assert!(!allow_trade(100.0, Some(100.0), &history, today, &config));
        assert!(!allow_trade(100.0, None, &history, today, &config));
        assert!(!allow_trade(1.0, Some(1.0), &history, today, &config));
    }

    #[test]
    fn test_trades_on_other_days_do_not_count() {
        let config = GateConfig {
            max_daily_trades: 5,
            ..Default::default()
        };
        let (history, today) = history_with_trades_today(5);
        let tomorrow = today.succ_opt().unwrap();

        assert!(allow_trade(100.0, Some(100.0), &history, tomorrow, &config));
    }

    #[test]
    fn test_volatility_breaker_blocks_regardless_of_count() {
        let (history, today) = history_with_trades_today(0);

        // 11% jump up
        assert!(!allow_trade(
            111.0,
            Some(100.0),
            &history,
            today,
            &GateConfig::default()
        ));
        // 11% drop
        assert!(!allow_trade(
            89.0,
            Some(100.0),
            &history,
            today,
            &GateConfig::default()
        ));
        // Exactly 10% is not strictly greater, so it passes
        assert!(allow_trade(
            110.0,
            Some(100.0),
            &history,
            today,
            &GateConfig::default()
        ));
    }

    #[test]
    fn test_unknown_last_price_skips_volatility_check() {
        let (history, today) = history_with_trades_today(0);
        assert!(allow_trade(
            100.0,
            None,
            &history,
            today,
            &GateConfig::default()
        ));
    }
}
