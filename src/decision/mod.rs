//! Position/risk decision engine.
//!
//! A small state machine over {Flat, Long}: given the voted signal, the
//! market risk factor, balances and the last filled BUY, it produces one
//! bounded trade action per cycle. It owns no state of its own; the
//! caller commits the transition only after a confirmed fill.

use crate::models::{AccountState, ExecutedOrder, Position, Signal};

/// Sizing and exit parameters. Defaults: risk 10% of the relevant balance
/// per trade, hard cap at 20% after risk scaling, take profit at +5%,
/// stop loss at -5% from the entry price.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub risk_per_trade: f64,
    pub max_risk: f64,
    pub profitability: f64,
    pub stop_loss: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.10,
            max_risk: 0.2,
            profitability: 1.05,
            stop_loss: 0.95,
        }
    }
}

impl RiskConfig {
    /// Risk fraction after volatility scaling, never above `max_risk`.
    pub fn adjusted_risk(&self, risk_factor: f64) -> f64 {
        (self.risk_per_trade * risk_factor).min(self.max_risk)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

/// The one action this cycle. Amounts are in base asset units; a Sell
/// carries the limit price to submit.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeAction {
    Buy { amount: f64 },
    Sell { price: f64, amount: f64, reason: ExitReason },
    Hold,
}

/// Decide the cycle's action.
///
/// - Flat + BUY signal + quote balance: buy `balance * adjusted_risk`
///   worth at the current price.
/// - Long + SELL signal + base balance: exit only through the take-profit
///   or stop-loss threshold anchored at the last filled BUY; between the
///   two thresholds the raw signal is overridden to Hold. Without an
///   entry reference there is nothing to anchor the exits to, so Hold.
/// - Anything else: Hold.
///
/// Pure and idempotent; never emits a buy and a sell simultaneously.
pub fn decide(
    signal: Signal,
    position: Position,
    account: &AccountState,
    executed_orders: &[ExecutedOrder],
    current_price: f64,
    risk_factor: f64,
    config: &RiskConfig,
) -> TradeAction {
    let adjusted_risk = config.adjusted_risk(risk_factor);

    match (position, signal) {
        (Position::Flat, Signal::Buy) if account.brl > 0.0 && current_price > 0.0 => {
            let amount = (account.brl * adjusted_risk) / current_price;
            TradeAction::Buy { amount }
        }
        (Position::Long, Signal::Sell) if account.btc > 0.0 => {
            let Some(entry) = executed_orders.iter().find(|o| o.is_filled_buy()) else {
                tracing::warn!("sell signal without a filled buy on record, holding");
                return TradeAction::Hold;
            };

            let take_profit = entry.price * config.profitability;
            let stop_loss = entry.price * config.stop_loss;
            let amount = account.btc * adjusted_risk;

            if current_price >= take_profit {
                TradeAction::Sell {
                    price: current_price,
                    amount,
                    reason: ExitReason::TakeProfit,
                }
            } else if current_price <= stop_loss {
                TradeAction::Sell {
                    price: stop_loss,
                    amount,
                    reason: ExitReason::StopLoss,
                }
            } else {
                tracing::debug!(
                    "price {:.2} inside exit corridor [{:.2}, {:.2}], holding",
                    current_price,
                    stop_loss,
                    take_profit
                );
                TradeAction::Hold
            }
        }
        _ => TradeAction::Hold,
    }
}
