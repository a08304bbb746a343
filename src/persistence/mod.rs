// Persistence module
// CSV-backed price history (one file per pair) and append-only trade log.

pub mod price_history;
pub mod trade_log;

pub use price_history::{merge_bars, PriceHistoryStore};
pub use trade_log::TradeLog;
