//! 📖 The ReaderWorker: opens the capture file, turns each line into a [`RawAlert`],
//! and pushes it down the channel. Lines that aren't alerts are reported, not replayed.

use anyhow::{Context, Result};
use async_channel::Sender;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ReplayItem, Worker, WorkerReport};
use crate::alerts::RawAlert;
use crate::progress::ReplayRecord;

#[derive(Debug)]
pub(in crate::supervisors) struct ReaderWorker {
    path: PathBuf,
    alerts: Sender<ReplayItem>,
    reports: Sender<WorkerReport>,
}

impl ReaderWorker {
    pub(in crate::supervisors) fn new(path: PathBuf, alerts: Sender<ReplayItem>, reports: Sender<WorkerReport>) -> Self {
        Self { path, alerts, reports }
    }

    fn parse_line(line: &str) -> Result<RawAlert, String> {
        let value: serde_json::Value = serde_json::from_str(line).map_err(|e| format!("not JSON: {e}"))?;
        let raw = RawAlert::from_json(&value).map_err(|e| format!("{e:#}"))?;
        if raw.is_empty() {
            return Err("empty alert".to_string());
        }
        Ok(raw)
    }
}

impl Worker for ReaderWorker {
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let file = File::open(&self.path)
                .await
                .with_context(|| format!("💀 Could not open the replay file '{}'", self.path.display()))?;
            let mut reader = BufReader::new(file);
            let mut line = String::new();
            let mut line_no = 0usize;
            let mut offset = 0u64;

            loop {
                line.clear();
                let bytes_read = reader
                    .read_line(&mut line)
                    .await
                    .with_context(|| format!("💀 Failed reading '{}' at line {}", self.path.display(), line_no + 1))?;
                if bytes_read == 0 {
                    break;
                }
                line_no += 1;
                offset += bytes_read as u64;

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match Self::parse_line(trimmed) {
                    Ok(raw) => {
                        // -- a closed channel means every worker is gone; nothing left to feed
                        if self.alerts.send(ReplayItem { line: line_no, offset, raw }).await.is_err() {
                            warn!("⚠️ No alert workers left, stopping the read at line {}", line_no);
                            break;
                        }
                    }
                    Err(problem) => {
                        warn!("⚠️ Line {} of '{}' skipped: {}", line_no, self.path.display(), problem);
                        let report = WorkerReport {
                            offset,
                            record: ReplayRecord {
                                line: line_no,
                                outcome: Err(problem),
                            },
                        };
                        if self.reports.send(report).await.is_err() {
                            break;
                        }
                    }
                }
            }

            debug!("🏁 ReaderWorker: {} lines read from '{}'", line_no, self.path.display());
            Ok(())
        })
    }
}
