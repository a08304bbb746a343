use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::models::{
    Crossover, IndicatorSnapshot, Position, PriceBar, Signal, SignalRow, Trend,
};

/// Flat CSV record for one signal row. Integer-coded fields are validated
/// back into their domain enums on load; an out-of-range value is a fatal
/// validation error, not a silently corrected one.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRecord {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    ema_5: f64,
    ema_10: f64,
    ema_20: f64,
    ema_200: f64,
    macd: f64,
    macd_signal: f64,
    macd_hist: f64,
    rsi: f64,
    bb_upper: f64,
    bb_middle: f64,
    bb_lower: f64,
    stoch_k: f64,
    stoch_d: f64,
    volume_sma: f64,
    atr: f64,
    trend: String,
    ema_cross: i64,
    macd_cross: i64,
    signal: i64,
    position: i64,
}

impl From<&SignalRow> for HistoryRecord {
    fn from(row: &SignalRow) -> Self {
        Self {
            timestamp: row.bar.timestamp,
            open: row.bar.open,
            high: row.bar.high,
            low: row.bar.low,
            close: row.bar.close,
            volume: row.bar.volume,
            ema_5: row.indicators.ema_5,
            ema_10: row.indicators.ema_10,
            ema_20: row.indicators.ema_20,
            ema_200: row.indicators.ema_200,
            macd: row.indicators.macd,
            macd_signal: row.indicators.macd_signal,
            macd_hist: row.indicators.macd_hist,
            rsi: row.indicators.rsi,
            bb_upper: row.indicators.bb_upper,
            bb_middle: row.indicators.bb_middle,
            bb_lower: row.indicators.bb_lower,
            stoch_k: row.indicators.stoch_k,
            stoch_d: row.indicators.stoch_d,
            volume_sma: row.indicators.volume_sma,
            atr: row.indicators.atr,
            trend: match row.trend {
                Trend::Alta => "alta".to_string(),
                Trend::Baixa => "baixa".to_string(),
            },
            ema_cross: row.ema_cross.as_i8() as i64,
            macd_cross: row.macd_cross.as_i8() as i64,
            signal: row.signal.as_i8() as i64,
            position: row.position.as_i8() as i64,
        }
    }
}

impl TryFrom<HistoryRecord> for SignalRow {
    type Error = BotError;

    fn try_from(record: HistoryRecord) -> Result<Self> {
        let trend = match record.trend.as_str() {
            "alta" => Trend::Alta,
            "baixa" => Trend::Baixa,
            other => {
                return Err(BotError::Validation(format!(
                    "unknown trend label '{}'",
                    other
                )))
            }
        };

        Ok(SignalRow {
            bar: PriceBar {
                timestamp: record.timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            },
            indicators: IndicatorSnapshot {
                ema_5: record.ema_5,
                ema_10: record.ema_10,
                ema_20: record.ema_20,
                ema_200: record.ema_200,
                macd: record.macd,
                macd_signal: record.macd_signal,
                macd_hist: record.macd_hist,
                rsi: record.rsi,
                bb_upper: record.bb_upper,
                bb_middle: record.bb_middle,
                bb_lower: record.bb_lower,
                stoch_k: record.stoch_k,
                stoch_d: record.stoch_d,
                volume_sma: record.volume_sma,
                atr: record.atr,
            },
            trend,
            ema_cross: Crossover::try_from(record.ema_cross)?,
            macd_cross: Crossover::try_from(record.macd_cross)?,
            signal: Signal::try_from(record.signal)?,
            position: Position::try_from(record.position)?,
        })
    }
}

/// Per-pair CSV store for the audited signal rows.
///
/// One file per pair, written by exactly one producer (that pair's cycle
/// loop). Timestamps round-trip as UTC.
pub struct PriceHistoryStore {
    path: PathBuf,
}

impl PriceHistoryStore {
    pub fn new(data_dir: &Path, pair: &str) -> Self {
        let filename = format!("{}_history.csv", pair.to_lowercase().replace('-', "_"));
        Self {
            path: data_dir.join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all persisted rows, oldest first. A missing file is an empty
    /// history, not an error.
    pub fn load(&self) -> Result<Vec<SignalRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for result in reader.deserialize::<HistoryRecord>() {
            rows.push(SignalRow::try_from(result?)?);
        }

        tracing::debug!("loaded {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Persist the full series atomically (temp file + rename), so a
    /// crash mid-write never leaves a truncated history behind.
    pub fn save(&self, rows: &[SignalRow]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for row in rows {
                writer.serialize(HistoryRecord::from(row))?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!("saved {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

/// Merge cached bars with freshly fetched ones: deduplicate by timestamp
/// keeping the newest version of a bar, then sort ascending.
pub fn merge_bars(existing: Vec<PriceBar>, fresh: Vec<PriceBar>) -> Vec<PriceBar> {
    let mut merged: Vec<PriceBar> = existing;
    for bar in fresh {
        if let Some(slot) = merged.iter_mut().find(|b| b.timestamp == bar.timestamp) {
            *slot = bar;
        } else {
            merged.push(bar);
        }
    }
    merged.sort_by_key(|b| b.timestamp);
    merged
}
