use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::Duration;

use crate::error::{BotError, Result};
use crate::models::{AccountState, ExecutedOrder, OrderSide, PriceBar};

use super::{ExchangeApi, OrderConfirmation, OrderRequest, Ticker};

const PUBLIC_API_BASE: &str = "https://api.bitpreco.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const EXECUTED_ORDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// BitPreco REST client.
///
/// Prices and volumes arrive as arbitrary-precision decimals and are
/// converted to f64 only after leaving the wire types.
#[derive(Clone)]
pub struct BitprecoClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    last: Decimal,
    high: Decimal,
    low: Decimal,
    vol: Decimal,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    success: bool,
    #[serde(rename = "BRL", default)]
    brl: Option<Decimal>,
    #[serde(rename = "BTC", default)]
    btc: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ExecutedOrdersResponse {
    success: bool,
    #[serde(default)]
    orders: Vec<WireOrder>,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    #[serde(rename = "type")]
    side: String,
    status: String,
    price: Decimal,
    amount: Decimal,
    timestamp: String,
}

/// TradingView-style columnar history payload.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<Decimal>,
    #[serde(default)]
    h: Vec<Decimal>,
    #[serde(default)]
    l: Vec<Decimal>,
    #[serde(default)]
    c: Vec<Decimal>,
    #[serde(default)]
    v: Vec<Decimal>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    success: bool,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl BitprecoClient {
    pub fn new(auth_token: String) -> Result<Self> {
        Self::with_base_url(PUBLIC_API_BASE.to_string(), auth_token)
    }

    /// Client against an explicit base URL (tests point this at a mock
    /// server).
    pub fn with_base_url(base_url: String, auth_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BotError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    fn trading_url(&self) -> String {
        format!("{}/trading", self.base_url)
    }

    async fn trading_post<T: for<'de> Deserialize<'de>>(
        &self,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let mut payload: Vec<(&str, &str)> = vec![("auth_token", self.auth_token.as_str())];
        payload.extend_from_slice(form);

        let response = self
            .client
            .post(self.trading_url())
            .form(&payload)
            .send()
            .await?;

        Ok(response.json::<T>().await?)
    }

    fn parse_order_timestamp(raw: &str) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(raw, EXECUTED_ORDER_TIME_FORMAT)
            .map_err(|e| BotError::Validation(format!("bad order timestamp '{}': {}", raw, e)))?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    fn parse_order_side(raw: &str) -> Result<OrderSide> {
        match raw {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(BotError::Validation(format!(
                "unknown order side '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl ExchangeApi for BitprecoClient {
    async fn ticker(&self, pair: &str) -> Result<Ticker> {
        let url = format!("{}/{}/ticker", self.base_url, pair.to_lowercase());
        let response = self.client.get(&url).send().await?;
        let ticker: TickerResponse = response.json().await?;

        Ok(Ticker {
            last: to_f64(ticker.last),
            high_24h: to_f64(ticker.high),
            low_24h: to_f64(ticker.low),
            volume_24h: to_f64(ticker.vol),
        })
    }

    async fn balance(&self) -> Result<AccountState> {
        let response: BalanceResponse = self.trading_post(&[("cmd", "balance")]).await?;
        if !response.success {
            return Err(BotError::Execution("balance request refused".to_string()));
        }

        Ok(AccountState {
            brl: response.brl.map(to_f64).unwrap_or(0.0),
            btc: response.btc.map(to_f64).unwrap_or(0.0),
        })
    }

    async fn executed_orders(&self, pair: &str) -> Result<Vec<ExecutedOrder>> {
        let response: ExecutedOrdersResponse = self
            .trading_post(&[("cmd", "executed_orders"), ("market", pair)])
            .await?;
        if !response.success {
            return Err(BotError::Execution(
                "executed orders request refused".to_string(),
            ));
        }

        response
            .orders
            .into_iter()
            .map(|order| {
                Ok(ExecutedOrder {
                    side: Self::parse_order_side(&order.side)?,
                    status: order.status,
                    price: to_f64(order.price),
                    amount: to_f64(order.amount),
                    timestamp: Self::parse_order_timestamp(&order.timestamp)?,
                })
            })
            .collect()
    }

    async fn price_history(
        &self,
        pair: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<PriceBar>> {
        let url = format!("{}/tradingview/history", self.base_url);
        let symbol = pair.to_uppercase().replace('-', "_");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("resolution", resolution),
                ("from", &from.to_string()),
                ("to", &to.to_string()),
            ])
            .send()
            .await?;
        let history: HistoryResponse = response.json().await?;

        if history.s != "ok" {
            return Err(BotError::DataUnavailable(format!(
                "history for {} returned status '{}'",
                pair, history.s
            )));
        }

        let len = history.t.len();
        if [&history.o, &history.h, &history.l, &history.c, &history.v]
            .iter()
            .any(|col| col.len() != len)
        {
            return Err(BotError::Validation(
                "ragged columnar history payload".to_string(),
            ));
        }

        let mut bars = Vec::with_capacity(len);
        for i in 0..len {
            let timestamp = Utc
                .timestamp_opt(history.t[i], 0)
                .single()
                .ok_or_else(|| {
                    BotError::Validation(format!("bad bar timestamp {}", history.t[i]))
                })?;

            bars.push(PriceBar {
                timestamp,
                open: to_f64(history.o[i]),
                high: to_f64(history.h[i]),
                low: to_f64(history.l[i]),
                close: to_f64(history.c[i]),
                volume: to_f64(history.v[i]),
            });
        }

        Ok(bars)
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        let cmd = match order.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let price = order.price.to_string();
        let volume = order.volume.to_string();

        let response: OrderResponse = self
            .trading_post(&[
                ("cmd", cmd),
                ("market", order.pair.as_str()),
                ("price", price.as_str()),
                ("volume", volume.as_str()),
                ("amount", volume.as_str()),
                ("limited", "true"),
            ])
            .await?;

        if !response.success {
            return Err(BotError::Execution(
                response
                    .message
                    .unwrap_or_else(|| "order rejected by exchange".to_string()),
            ));
        }

        Ok(OrderConfirmation {
            order_id: response.order_id.unwrap_or_default(),
        })
    }
}
