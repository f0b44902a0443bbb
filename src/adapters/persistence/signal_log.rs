//! Signal Log - Append-only JSONL Signal Records
//!
//! Persists arbitrage signals to daily JSONL files in the format
//! `signals/YYYY-MM-DD.jsonl`, keyed by the day the signal was observed.
//! Each line is a self-contained JSON record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::ports::report_store::SignalRecord;

/// Append-only JSONL signal logger with daily file rotation.
pub struct SignalLog {
    /// Base directory for signal files.
    signals_dir: PathBuf,
}

impl SignalLog {
    /// Create a new signal log in the given data directory.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let signals_dir = data_dir.as_ref().join("signals");

        fs::create_dir_all(&signals_dir)
            .await
            .context("Failed to create signals directory")?;

        Ok(Self { signals_dir })
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.signals_dir
            .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append records, each to the file of the day it was observed.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn append(&self, records: &[SignalRecord]) -> Result<()> {
        let mut start = 0;
        while start < records.len() {
            let day = records[start].observed_at.date_naive();
            let end = records[start..]
                .iter()
                .position(|r| r.observed_at.date_naive() != day)
                .map_or(records.len(), |offset| start + offset);

            let mut buf = String::new();
            for record in &records[start..end] {
                buf.push_str(
                    &serde_json::to_string(record).context("Failed to serialize signal record")?,
                );
                buf.push('\n');
            }

            let path = self.day_path(day);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("Failed to open signal log {}", path.display()))?;

            file.write_all(buf.as_bytes())
                .await
                .context("Failed to write signal records")?;
            file.flush().await.context("Failed to flush signal log")?;

            debug!(file = %path.display(), lines = end - start, "Signals appended");
            start = end;
        }
        Ok(())
    }

    /// Load all records logged for one day.
    pub async fn load_day(&self, date: NaiveDate) -> Result<Vec<SignalRecord>> {
        let path = self.day_path(date);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SignalRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping malformed signal record"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Check if the signals directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.signals_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
