use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::backends::{Receipt, Sink};
use crate::enrich::Envelope;

// -- 🚰 FileSinkConfig lives next to its FileSink. One backend = one config = one file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileSinkConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 📁 Where the envelopes land. Created on startup when missing.
    pub folder: PathBuf,
}

fn default_enabled() -> bool {
    true
}

/// 🚰 FileSink: one envelope in, one JSON file out.
///
/// File names carry enough to find an alert with `ls`:
/// `ctm-<enriched|basic>-<job|core|infra>-<alert id, 8 digits>-<epoch micros>.json`
#[derive(Debug)]
pub(crate) struct FileSink {
    folder: PathBuf,
}

impl FileSink {
    /// 🚀 Make sure the folder exists, then stand by.
    pub(crate) async fn new(config: FileSinkConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.folder).await.with_context(|| {
            format!(
                "💀 The alert folder '{}' could not be conjured into existence. \
                 We stared at the path. The path stared back. Check the permissions.",
                config.folder.display()
            )
        })?;
        Ok(Self {
            folder: config.folder,
        })
    }

    pub(crate) fn folder(&self) -> &Path {
        &self.folder
    }

    fn file_name_for(envelope: &Envelope) -> String {
        let mode = if envelope.enriched { "enriched" } else { "basic" };
        let stamp = chrono::Utc::now().timestamp_micros();
        format!(
            "ctm-{}-{}-{:0>8}-{}.json",
            mode,
            envelope.kind.as_str(),
            envelope.alert.alert_id(),
            stamp
        )
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt> {
        let path = self.folder.join(Self::file_name_for(envelope));
        let body = serde_json::to_string_pretty(envelope)
            .context("💀 The envelope refused to become JSON. That should not be possible, and yet.")?;

        trace!("📬 envelope of {} bytes walked into the file sink", body.len());
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("💀 Could not write the alert file '{}'. Disk full? Read-only? Both?", path.display()))?;

        debug!("📁 Alert {} written to {}", envelope.alert.alert_id(), path.display());
        Ok(Receipt {
            sink: "file",
            reference: path.display().to_string(),
        })
    }

    /// 🗑️ Every write is already on disk. Nothing to flush.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
