//! 🚦 The AlertWorker: drains the alert channel through its own dispatcher.
//! A failed alert is a record, never a reason to stop.

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{ReplayItem, Worker, WorkerReport};
use crate::dispatch::AlertDispatcher;
use crate::progress::ReplayRecord;

#[derive(Debug)]
pub(in crate::supervisors) struct AlertWorker {
    id: usize,
    alerts: Receiver<ReplayItem>,
    reports: Sender<WorkerReport>,
    dispatcher: AlertDispatcher,
}

impl AlertWorker {
    pub(in crate::supervisors) fn new(
        id: usize,
        alerts: Receiver<ReplayItem>,
        reports: Sender<WorkerReport>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            id,
            alerts,
            reports,
            dispatcher,
        }
    }
}

impl Worker for AlertWorker {
    fn start(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("📥 AlertWorker {} started draining the channel", self.id);
            while let Ok(item) = self.alerts.recv().await {
                let outcome = self
                    .dispatcher
                    .process_raw(item.raw)
                    .await
                    .map_err(|err| format!("{err:#}"));
                let report = WorkerReport {
                    offset: item.offset,
                    record: ReplayRecord {
                        line: item.line,
                        outcome,
                    },
                };
                if self.reports.send(report).await.is_err() {
                    break;
                }
            }
            debug!("🏁 AlertWorker {}: channel closed, shutting down", self.id);
            self.dispatcher
                .close()
                .await
                .context("💀 AlertWorker failed to close its sinks")
        })
    }
}
