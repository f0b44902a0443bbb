//! Report Store Implementation - Concrete Adapter for the ReportStore Port
//!
//! Wraps `SnapshotStore` (atomic JSON snapshot) and `SignalLog` (JSONL
//! append-only files) into a single struct implementing `ReportStore`.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use super::signal_log::SignalLog;
use super::snapshot::SnapshotStore;
use crate::ports::report_store::{ReportStore, ScanReport, SignalRecord, StoredReport};

/// File-backed report store.
pub struct JsonReportStore {
    /// Latest-scan snapshot.
    snapshot: SnapshotStore,
    /// Daily signal log.
    signal_log: SignalLog,
}

impl JsonReportStore {
    pub const fn new(snapshot: SnapshotStore, signal_log: SignalLog) -> Self {
        Self {
            snapshot,
            signal_log,
        }
    }

    /// Create both stores under one data directory.
    pub async fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let snapshot = SnapshotStore::new(dir).await?;
        let signal_log = SignalLog::new(dir).await?;
        Ok(Self::new(snapshot, signal_log))
    }

    pub const fn signal_log(&self) -> &SignalLog {
        &self.signal_log
    }
}

#[async_trait]
impl ReportStore for JsonReportStore {
    async fn save_report(&self, report: &ScanReport) -> Result<()> {
        self.snapshot.save(report).await
    }

    async fn append_signals(&self, records: &[SignalRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.signal_log.append(records).await
    }

    async fn load_latest(&self) -> Result<Option<StoredReport>> {
        self.snapshot.load().await
    }

    async fn is_healthy(&self) -> bool {
        self.snapshot.is_healthy().await && self.signal_log.is_healthy().await
    }
}
