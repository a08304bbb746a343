//! Per-pair trading cycle.
//!
//! Each traded pair gets its own runner on its own task. A cycle pulls
//! fresh market data, recomputes the indicator/signal history, and maybe
//! submits one order. Cycle failures are logged and the loop carries on;
//! only a stop signal ends it.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

use crate::analysis::analyze_market;
use crate::api::{ExchangeApi, OrderRequest};
use crate::config::{BotConfig, RetryConfig, RuntimeSettings};
use crate::decision::{decide, TradeAction};
use crate::error::{BotError, Result};
use crate::gate::allow_trade;
use crate::indicators::compute_indicators;
use crate::models::{OrderSide, Position, TradeHistory, TradeRecord};
use crate::persistence::{merge_bars, PriceHistoryStore, TradeLog};
use crate::signal::generate_signals;

/// Candle resolution requested from the exchange, in minutes.
const CANDLE_RESOLUTION: &str = "1";
/// How far back to fetch on a cold start, in seconds. Enough one-minute
/// bars to warm up the EMA-200 and the MACD signal line on top of it.
const COLD_START_LOOKBACK_SECS: i64 = 500 * 60;
/// Stop-signal poll granularity while sleeping between cycles.
const SLEEP_STEP: Duration = Duration::from_secs(1);

/// Retry a fallible async operation on transient errors only, with a
/// doubling delay between attempts. Permanent errors return immediately.
pub async fn with_retry<T, F, Fut>(retry: &RetryConfig, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = Duration::from_secs(retry.base_delay_secs);
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    label,
                    attempt,
                    retry.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sleep for `duration` while polling the stop channel once per second.
/// Returns false if the stop signal arrived before the sleep finished.
pub async fn cancellable_sleep(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if *stop.borrow() {
            return false;
        }
        let step = remaining.min(SLEEP_STEP);
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = stop.changed() => {
                if *stop.borrow() {
                    return false;
                }
            }
        }
        remaining = remaining.saturating_sub(step);
    }
    !*stop.borrow()
}

/// Runs the trading cycle for one pair.
pub struct PairRunner<A: ExchangeApi> {
    api: Arc<A>,
    pair: String,
    config: BotConfig,
    settings_path: PathBuf,
    store: PriceHistoryStore,
    trade_log: TradeLog,
    trade_history: TradeHistory,
    position: Option<Position>,
    last_price: Option<f64>,
}

impl<A: ExchangeApi> PairRunner<A> {
    pub fn new(
        api: Arc<A>,
        pair: String,
        config: BotConfig,
        data_dir: PathBuf,
        settings_path: PathBuf,
    ) -> Result<Self> {
        let store = PriceHistoryStore::new(&data_dir, &pair);
        let trade_log = TradeLog::new(&data_dir, &pair);
        let trade_history = trade_log.load()?;

        Ok(Self {
            api,
            pair,
            config,
            settings_path,
            store,
            trade_log,
            trade_history,
            position: None,
            last_price: None,
        })
    }

    /// Cycle loop: run until the stop signal. The poll interval is
    /// re-read from the settings file every cycle, so operators can
    /// retune it live.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::info!("starting cycle loop for {}", self.pair);

        loop {
            if *stop.borrow() {
                break;
            }

            if let Err(e) = self.execute_cycle().await {
                tracing::error!("cycle for {} failed: {}", self.pair, e);
            }

            let settings = RuntimeSettings::load(&self.settings_path);
            let interval = Duration::from_secs(settings.interval_seconds);
            if !cancellable_sleep(interval, &mut stop).await {
                break;
            }
        }

        tracing::info!("cycle loop for {} stopped", self.pair);
    }

    /// One full cycle: fetch, recompute, persist, maybe trade.
    ///
    /// The indicator/signal history updates even when the trade gate
    /// rejects the cycle; the gate only suppresses order placement.
    pub async fn execute_cycle(&mut self) -> Result<()> {
        let retry = self.config.retry;
        let api = Arc::clone(&self.api);
        let pair = self.pair.clone();

        let ticker = with_retry(&retry, "ticker", || {
            let api = Arc::clone(&api);
            let pair = pair.clone();
            async move { api.ticker(&pair).await }
        })
        .await?;
        let account = with_retry(&retry, "balance", || {
            let api = Arc::clone(&api);
            async move { api.balance().await }
        })
        .await?;
        let executed_orders = with_retry(&retry, "executed_orders", || {
            let api = Arc::clone(&api);
            let pair = pair.clone();
            async move { api.executed_orders(&pair).await }
        })
        .await?;

        // Rebuild the bar series: persisted history plus whatever the
        // exchange has since the last stored bar.
        let stored_rows = self.store.load()?;
        let existing_bars: Vec<_> = stored_rows.iter().map(|r| r.bar.clone()).collect();

        let now = Utc::now().timestamp();
        let from = existing_bars
            .last()
            .map(|b| b.timestamp.timestamp())
            .unwrap_or(now - COLD_START_LOOKBACK_SECS);
        let fresh_bars = with_retry(&retry, "price_history", || {
            let api = Arc::clone(&api);
            let pair = pair.clone();
            async move { api.price_history(&pair, CANDLE_RESOLUTION, from, now).await }
        })
        .await?;

        let bars = merge_bars(existing_bars, fresh_bars);
        if bars.is_empty() {
            return Err(BotError::DataUnavailable(format!(
                "no price history for {}",
                self.pair
            )));
        }

        let snapshots = compute_indicators(&bars)?;
        let rows = generate_signals(&bars, &snapshots, &self.config.signal)?;
        let (trend_label, risk_factor) = analyze_market(&rows);

        let latest = rows.last().cloned().ok_or_else(|| {
            BotError::DataUnavailable(format!("empty signal history for {}", self.pair))
        })?;
        tracing::info!(
            "{}: price {:.2}, signal {:?}, trend {:?}, risk factor {:.2}",
            self.pair,
            ticker.last,
            latest.signal,
            trend_label,
            risk_factor
        );

        // Held position carries across cycles; seeded from the balance
        // the first time through.
        let position = *self.position.get_or_insert(if account.btc > 0.0 {
            Position::Long
        } else {
            Position::Flat
        });

        let gate_open = allow_trade(
            ticker.last,
            self.last_price,
            &self.trade_history,
            Utc::now().date_naive(),
            &self.config.gate,
        );

        if gate_open {
            let action = decide(
                latest.signal,
                position,
                &account,
                &executed_orders,
                ticker.last,
                risk_factor,
                &self.config.risk,
            );
            self.apply_action(action, ticker.last).await;
        } else {
            tracing::info!("{}: trade gate closed this cycle", self.pair);
        }

        self.store.save(&rows)?;
        self.last_price = Some(ticker.last);
        Ok(())
    }

    /// Submit the decided action and commit the held-position transition
    /// only on a confirmed order. A rejected order leaves every piece of
    /// state untouched so the next cycle re-decides from scratch. The
    /// persisted rows are not touched here: their position column mirrors
    /// the signal, while the held position lives on the runner.
    async fn apply_action(&mut self, action: TradeAction, current_price: f64) {
        let (side, price, amount) = match action {
            TradeAction::Buy { amount } => (OrderSide::Buy, current_price, amount),
            TradeAction::Sell { price, amount, reason } => {
                tracing::info!("{}: exiting position ({:?})", self.pair, reason);
                (OrderSide::Sell, price, amount)
            }
            TradeAction::Hold => return,
        };

        let request = OrderRequest {
            pair: self.pair.clone(),
            side,
            price,
            volume: amount,
        };

        let submission = with_retry(&self.config.retry, "place_order", || {
            let api = Arc::clone(&self.api);
            let request = request.clone();
            async move { api.place_order(&request).await }
        })
        .await;

        match submission {
            Ok(confirmation) => {
                tracing::info!(
                    "{}: {:?} order accepted (id {}, {:.8} @ {:.2})",
                    self.pair,
                    side,
                    confirmation.order_id,
                    amount,
                    price
                );

                let trade = TradeRecord {
                    id: Uuid::new_v4(),
                    timestamp: Utc::now(),
                    side,
                    price,
                    volume: amount,
                };
                if let Err(e) = self.trade_log.append(&trade) {
                    tracing::error!("{}: failed to log trade: {}", self.pair, e);
                }
                self.trade_history.push(trade);

                let new_position = match side {
                    OrderSide::Buy => Position::Long,
                    OrderSide::Sell => Position::Flat,
                };
                self.position = Some(new_position);
            }
            Err(e) => {
                tracing::error!("{}: order rejected, state unchanged: {}", self.pair, e);
            }
        }
    }
}

/// Which pairs need a runner started and which runners must stop, given
/// the configured list and the currently running ones.
fn reconcile_pairs(active: &[String], running: &[String]) -> (Vec<String>, Vec<String>) {
    let to_start = active
        .iter()
        .filter(|p| !running.contains(p))
        .cloned()
        .collect();
    let to_stop = running
        .iter()
        .filter(|p| !active.contains(p))
        .cloned()
        .collect();
    (to_start, to_stop)
}

/// Supervise one runner task per configured pair.
///
/// The settings file is re-read every poll interval; pairs added there
/// get a runner at the next boundary, removed pairs have theirs stopped
/// and joined. The global stop signal shuts everything down.
pub async fn supervise<A: ExchangeApi + 'static>(
    api: Arc<A>,
    config: BotConfig,
    data_dir: PathBuf,
    settings_path: PathBuf,
    mut stop: watch::Receiver<bool>,
) {
    let mut runners: HashMap<String, (watch::Sender<bool>, JoinHandle<()>)> = HashMap::new();

    loop {
        if *stop.borrow() {
            break;
        }

        let settings = RuntimeSettings::load(&settings_path);
        let running: Vec<String> = runners.keys().cloned().collect();
        let (to_start, to_stop) = reconcile_pairs(&settings.pairs, &running);

        for pair in to_stop {
            if let Some((pair_stop, handle)) = runners.remove(&pair) {
                tracing::info!("pair {} removed from settings, stopping its runner", pair);
                let _ = pair_stop.send(true);
                if let Err(e) = handle.await {
                    tracing::error!("runner for {} panicked: {}", pair, e);
                }
            }
        }

        for pair in to_start {
            match PairRunner::new(
                Arc::clone(&api),
                pair.clone(),
                config.clone(),
                data_dir.clone(),
                settings_path.clone(),
            ) {
                Ok(runner) => {
                    let (pair_stop, pair_rx) = watch::channel(false);
                    let handle = tokio::spawn(runner.run(pair_rx));
                    runners.insert(pair, (pair_stop, handle));
                }
                Err(e) => {
                    tracing::error!("cannot start runner for {}: {}", pair, e);
                }
            }
        }

        let interval = Duration::from_secs(settings.interval_seconds.max(1));
        if !cancellable_sleep(interval, &mut stop).await {
            break;
        }
    }

    for (pair, (pair_stop, handle)) in runners {
        let _ = pair_stop.send(true);
        if let Err(e) = handle.await {
            tracing::error!("runner for {} panicked: {}", pair, e);
        }
    }
}
