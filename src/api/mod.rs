// Exchange API module
// The trait is the seam between the trading cycle and the outside world;
// the BitPreco client is the production implementation.

pub mod bitpreco;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AccountState, ExecutedOrder, OrderSide, PriceBar};

pub use bitpreco::BitprecoClient;

/// Last-price snapshot from the exchange ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticker {
    pub last: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
}

/// A limit order to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub pair: String,
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
}

/// Exchange confirmation for a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: String,
}

/// Everything the trading cycle needs from an exchange. Implementations
/// must bound every call with a timeout; transient failures surface as
/// `BotError::Transient` so the retry helper can re-attempt them.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn ticker(&self, pair: &str) -> Result<Ticker>;

    async fn balance(&self) -> Result<AccountState>;

    /// Executed orders, newest first.
    async fn executed_orders(&self, pair: &str) -> Result<Vec<ExecutedOrder>>;

    /// OHLCV bars for `pair` between two epoch-second timestamps, at the
    /// given candle resolution (minutes, e.g. "1").
    async fn price_history(
        &self,
        pair: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<PriceBar>>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation>;
}
