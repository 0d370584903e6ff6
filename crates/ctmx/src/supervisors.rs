//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where alerts pile up in a capture file..."
//! 🎬 "One supervisor dared to replay them all."
//!
//! 📦 Replay mode. One reader, N alert workers, two channels:
//!
//! ```text
//! ReaderWorker ──(alerts, bounded)──▶ AlertWorker × N ──(reports)──▶ Supervisor ──▶ ReplaySummary
//!      └──────────────(unparseable lines)──────────────────────────────▲
//! ```
//!
//! ⚠️ The workers stay private. The Supervisor is the only one who talks to them.

mod workers;

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::app_config::AppConfig;
use crate::dispatch::AlertDispatcher;
use crate::progress::{ReplayProgress, ReplaySummary};
use workers::{AlertWorker, ReaderWorker, Worker};

/// 📦 Hovers over the workers asking "is it done yet?".
pub(crate) struct Supervisor {
    app_config: AppConfig,
    dry_run: bool,
    show_progress: bool,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self {
            app_config,
            dry_run: false,
            show_progress: true,
        }
    }

    pub(crate) fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub(crate) fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    async fn dispatcher(&self) -> Result<AlertDispatcher> {
        if self.dry_run {
            Ok(AlertDispatcher::dry_run(&self.app_config))
        } else {
            AlertDispatcher::from_config(&self.app_config).await
        }
    }

    /// 🧵 Replay every alert in `path` and wait for all of them.
    pub(crate) async fn replay(&self, path: &Path) -> Result<ReplaySummary> {
        let started = Instant::now();
        let runtime = &self.app_config.runtime;
        let total_size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("💀 The replay file '{}' is not there", path.display()))?
            .len();

        let (alert_tx, alert_rx) = async_channel::bounded(runtime.queue_capacity.max(1));
        let (report_tx, report_rx) = async_channel::unbounded();

        let mut handles = Vec::new();
        for id in 0..runtime.replay_parallelism.max(1) {
            let dispatcher = self.dispatcher().await?;
            handles.push(AlertWorker::new(id, alert_rx.clone(), report_tx.clone(), dispatcher).start());
        }
        handles.push(ReaderWorker::new(path.to_path_buf(), alert_tx, report_tx).start());
        drop(alert_rx);
        info!(
            "🧵 Replaying '{}' with {} worker(s)",
            path.display(),
            runtime.replay_parallelism.max(1)
        );

        let mut progress = if self.show_progress {
            ReplayProgress::new(path.display().to_string(), total_size)
        } else {
            ReplayProgress::hidden()
        };
        let mut records = Vec::new();
        while let Ok(report) = report_rx.recv().await {
            progress.record(report.record.is_ok(), report.offset);
            records.push(report.record);
        }
        progress.finish();

        for handle in handles {
            handle.await.context("💀 A replay worker panicked")??;
        }

        records.sort_by_key(|r| r.line);
        Ok(ReplaySummary {
            records,
            elapsed: started.elapsed(),
        })
    }
}
