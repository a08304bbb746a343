use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{TradeHistory, TradeRecord};

/// Append-only CSV log of executed trades.
///
/// Loaded once at session start; appended after every confirmed fill;
/// never mutated otherwise. The gate reads the per-day count from it.
pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    pub fn new(data_dir: &Path, pair: &str) -> Self {
        let filename = format!("{}_trades.csv", pair.to_lowercase().replace('-', "_"));
        Self {
            path: data_dir.join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TradeHistory> {
        if !self.path.exists() {
            return Ok(TradeHistory::default());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut trades = Vec::new();
        for result in reader.deserialize::<TradeRecord>() {
            trades.push(result?);
        }

        tracing::info!(
            "loaded {} trades from {}",
            trades.len(),
            self.path.display()
        );
        Ok(TradeHistory::new(trades))
    }

    /// Append one executed trade. The header is written only when the
    /// file is created.
    pub fn append(&self, trade: &TradeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        writer.serialize(trade)?;
        writer.flush()?;

        Ok(())
    }
}
