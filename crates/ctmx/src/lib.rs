//! 🚨 ctmx: Control-M alerts in, incidents / events / files out.
//!
//! Control-M calls us once per alert with the alert as command-line arguments. We parse it,
//! normalize it, ask the Automation API what actually happened to the job, and hand the
//! result to whichever sinks are switched on. Replay mode does the same for a capture file.
//!
//! 🦆 The duck is on call too. It has not been told.

pub mod alerts;
pub mod app_config;
pub mod backends;
pub(crate) mod common;
pub mod dispatch;
pub mod enrich;
pub(crate) mod progress;
pub mod resolver;
mod supervisors;

use anyhow::{Context, Result};
use std::path::Path;

pub use alerts::ArgStyle;
pub use app_config::AppConfig;
pub use dispatch::{AlertDispatcher, IncidentDecision, Outcome, decide_incident};
pub use progress::{ReplayRecord, ReplaySummary};

use crate::supervisors::Supervisor;

/// 🚀 Handle one alert, the way Control-M's alert script hands it over.
pub async fn run_alert(config: &AppConfig, args: &[String], style: ArgStyle, dry_run: bool) -> Result<Outcome> {
    let dispatcher = if dry_run {
        AlertDispatcher::dry_run(config)
    } else {
        AlertDispatcher::from_config(config)
            .await
            .context("💀 Failed to set up the sinks")?
    };
    let mut dispatcher = dispatcher.with_style(style);
    let outcome = dispatcher.process(args).await?;
    dispatcher.close().await.context("💀 Failed to close the sinks")?;
    Ok(outcome)
}

/// 🧵 Replay a capture file (one JSON alert per line) through the worker pool.
pub async fn run_replay(config: AppConfig, path: &Path, dry_run: bool, show_progress: bool) -> Result<ReplaySummary> {
    Supervisor::new(config)
        .dry_run(dry_run)
        .show_progress(show_progress)
        .replay(path)
        .await
        .with_context(|| format!("💀 Replay of '{}' did not finish", path.display()))
}
