//! Snapshot Store - Atomic JSON Scan Report Persistence
//!
//! Saves the latest scan report to `latest_scan.json` using atomic
//! writes (write to tmp file, then rename), so readers never observe a
//! partially written report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::ports::report_store::{ScanReport, StoredReport};

const SNAPSHOT_FILE: &str = "latest_scan.json";

/// Atomic JSON store for the most recent scan report.
pub struct SnapshotStore {
    /// Path to latest_scan.json.
    snapshot_path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl SnapshotStore {
    /// Create a new snapshot store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            snapshot_path: dir.join(SNAPSHOT_FILE),
            tmp_path: dir.join(format!("{SNAPSHOT_FILE}.tmp")),
        })
    }

    /// Save a report atomically (tmp → rename).
    #[instrument(skip(self, report), fields(cycle = report.summary.cycle))]
    pub async fn save(&self, report: &ScanReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize scan report")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp snapshot file")?;

        fs::rename(&self.tmp_path, &self.snapshot_path)
            .await
            .context("Failed to rename snapshot file")?;

        debug!(
            path = %self.snapshot_path.display(),
            bytes = json.len(),
            "Scan snapshot saved"
        );

        Ok(())
    }

    /// Load the most recent report.
    ///
    /// Returns `None` if no snapshot exists (first startup).
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<StoredReport>> {
        if !fs::try_exists(&self.snapshot_path).await.unwrap_or(false) {
            info!("No scan snapshot found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.snapshot_path)
            .await
            .context("Failed to read snapshot file")?;

        let report: StoredReport =
            serde_json::from_str(&json).context("Failed to parse snapshot JSON")?;

        info!(
            cycle = report.summary.cycle,
            markets = report.summary.markets,
            signals = report.summary.signals,
            "Scan snapshot loaded"
        );

        Ok(Some(report))
    }

    /// Check if the data directory is still present.
    pub async fn is_healthy(&self) -> bool {
        match self.snapshot_path.parent() {
            Some(dir) => fs::metadata(dir).await.is_ok(),
            None => false,
        }
    }
}
