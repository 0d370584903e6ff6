//! 🧵 Workers: the ones who actually do the work while the Supervisor takes all
//! the credit in the sprint retro.
//!
//! - [`ReaderWorker`] reads the capture file and feeds the alert channel.
//! - [`AlertWorker`] drains the alert channel through its own dispatcher.
//!
//! Both report into one record channel that the Supervisor drains.

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::alerts::RawAlert;

mod alert_worker;
mod reader_worker;

pub(super) use alert_worker::AlertWorker;
pub(super) use reader_worker::ReaderWorker;

/// 🏗️ A background worker, that does work. duh.
pub(super) trait Worker {
    /// 🚀 Start the worker. Returns a JoinHandle because we trust
    /// but verify. Mostly verify.
    fn start(self) -> JoinHandle<Result<()>>;
}

/// 📬 One captured alert on its way to a worker.
#[derive(Debug)]
pub(super) struct ReplayItem {
    pub(super) line: usize,
    /// byte offset just past this line, for the progress bar
    pub(super) offset: u64,
    pub(super) raw: RawAlert,
}

/// 📮 What comes back up to the Supervisor.
#[derive(Debug)]
pub(super) struct WorkerReport {
    pub(super) offset: u64,
    pub(super) record: crate::progress::ReplayRecord,
}
