use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use bitbot::api::BitprecoClient;
use bitbot::bot::supervise;
use bitbot::config::{BotConfig, RuntimeSettings};
use bitbot::error::BotError;
use bitbot::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    tracing::info!("🚀 BitBot starting");

    let auth_token = std::env::var("BITPRECO_AUTH_TOKEN")
        .map_err(|_| BotError::Config("BITPRECO_AUTH_TOKEN not found in environment".to_string()))?;
    let data_dir = PathBuf::from(
        std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
    );
    let settings_path = PathBuf::from(
        std::env::var("SETTINGS_FILE").unwrap_or_else(|_| "interval.json".to_string()),
    );

    let config = BotConfig::from_env();
    let settings = RuntimeSettings::load(&settings_path);
    let api = Arc::new(BitprecoClient::new(auth_token)?);

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Pairs: {:?}", settings.pairs);
    tracing::info!("  Poll interval: {}s", settings.interval_seconds);
    tracing::info!("  Risk per trade: {}%", config.risk.risk_per_trade * 100.0);
    tracing::info!("  Max daily trades: {}", config.gate.max_daily_trades);

    let (stop_tx, stop_rx) = watch::channel(false);

    // The supervisor re-reads the settings file every poll interval, so
    // pair list and cadence changes take effect without a restart.
    let supervisor = tokio::spawn(supervise(
        Arc::clone(&api),
        config,
        data_dir,
        settings_path,
        stop_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
    let _ = stop_tx.send(true);

    if let Err(e) = supervisor.await {
        tracing::error!("supervisor task panicked: {}", e);
    }

    tracing::info!("BitBot stopped cleanly");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "bitbot=info".to_string()),
        )
        .init();
}
