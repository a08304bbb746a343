use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BotError;

/// One OHLCV bar of price history.
///
/// Timestamps are UTC and strictly increasing within a series. Prices are
/// decimals at the exchange boundary but indicator math runs on f64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Technical indicators attached to a bar.
///
/// Any indicator requiring more history than available is NaN for early
/// bars. NaN is expected data, not an error: the voter treats NaN operands
/// as "condition false".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub ema_5: f64,
    pub ema_10: f64,
    pub ema_20: f64,
    pub ema_200: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub volume_sma: f64,
    pub atr: f64,
}

impl IndicatorSnapshot {
    pub fn empty() -> Self {
        Self {
            ema_5: f64::NAN,
            ema_10: f64::NAN,
            ema_20: f64::NAN,
            ema_200: f64::NAN,
            macd: f64::NAN,
            macd_signal: f64::NAN,
            macd_hist: f64::NAN,
            rsi: f64::NAN,
            bb_upper: f64::NAN,
            bb_middle: f64::NAN,
            bb_lower: f64::NAN,
            stoch_k: f64::NAN,
            stoch_d: f64::NAN,
            volume_sma: f64::NAN,
            atr: f64::NAN,
        }
    }
}

/// Per-bar trend relative to the EMA-200.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    #[serde(rename = "alta")]
    Alta,
    #[serde(rename = "baixa")]
    Baixa,
}

/// Ternary trading signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

impl TryFrom<i64> for Signal {
    type Error = BotError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Signal::Buy),
            -1 => Ok(Signal::Sell),
            0 => Ok(Signal::Hold),
            other => Err(BotError::Validation(format!(
                "signal value {} outside {{-1, 0, 1}}",
                other
            ))),
        }
    }
}

/// One-bar crossover direction (fast vs slow line).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Crossover {
    Up,
    Down,
    #[default]
    None,
}

impl Crossover {
    pub fn as_i8(self) -> i8 {
        match self {
            Crossover::Up => 1,
            Crossover::Down => -1,
            Crossover::None => 0,
        }
    }
}

impl TryFrom<i64> for Crossover {
    type Error = BotError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Crossover::Up),
            -1 => Ok(Crossover::Down),
            0 => Ok(Crossover::None),
            other => Err(BotError::Validation(format!(
                "crossover value {} outside {{-1, 0, 1}}",
                other
            ))),
        }
    }
}

/// Book-keeping position column, mirroring the signal over the same
/// {-1, 0, 1} domain. The decision engine itself only ever holds Flat or
/// Long: the base asset balance cannot go negative, so Short exists here
/// purely as persisted sell-side bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Position {
    Long,
    #[default]
    Flat,
    Short,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Flat => 0,
            Position::Short => -1,
        }
    }
}

impl TryFrom<i64> for Position {
    type Error = BotError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Position::Long),
            0 => Ok(Position::Flat),
            -1 => Ok(Position::Short),
            other => Err(BotError::Validation(format!(
                "position value {} outside {{-1, 0, 1}}",
                other
            ))),
        }
    }
}

/// A price bar with its indicators and derived signal fields. One of these
/// is appended to the price history store per cycle for audit. Persistence
/// flattens this into its own CSV record type, where the integer codecs
/// are validated on the way back in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub bar: PriceBar,
    pub indicators: IndicatorSnapshot,
    pub trend: Trend,
    pub ema_cross: Crossover,
    pub macd_cross: Crossover,
    pub signal: Signal,
    pub position: Position,
}

/// Quote and base balances, refreshed from the exchange each cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AccountState {
    pub brl: f64,
    pub btc: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

/// An order already executed on the exchange. Only the most recent FILLED
/// BUY matters to the decision engine: it anchors take-profit/stop-loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutedOrder {
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub status: String,
    pub price: f64,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutedOrder {
    pub fn is_filled_buy(&self) -> bool {
        self.side == OrderSide::Buy && self.status == "FILLED"
    }
}

/// One executed trade in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
}

/// Ordered append-only log of executed trades. Loaded once at session
/// start, appended after every confirmed fill.
#[derive(Debug, Clone, Default)]
pub struct TradeHistory {
    trades: Vec<TradeRecord>,
}

impl TradeHistory {
    pub fn new(trades: Vec<TradeRecord>) -> Self {
        Self { trades }
    }

    pub fn push(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Count of trades executed on the given (UTC) date, used by the
    /// daily-cap gate rule.
    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.trades
            .iter()
            .filter(|t| t.timestamp.date_naive() == date)
            .count()
    }
}
