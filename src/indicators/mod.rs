// Technical indicators module
// EMA/SMA, MACD, RSI, Bollinger Bands, Stochastic, volume SMA and ATR,
// assembled into per-bar snapshots by the engine.

pub mod atr;
pub mod bollinger;
pub mod engine;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;

pub use atr::atr_series;
pub use bollinger::bollinger_series;
pub use engine::compute_indicators;
pub use macd::macd_series;
pub use moving_average::{ema_series, sma_series};
pub use rsi::rsi_series;
pub use stochastic::stochastic_series;
