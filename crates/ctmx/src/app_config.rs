//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every on-call engineer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! ```toml
//! [control_m]
//! url = "https://ctm-em:8443/automation-api"
//! username = "emuser"
//! password = "..."
//! tls_verify = false
//!
//! [[control_m.datacenters]]
//! name = "psctm"
//! host = "ctm-srv.example.com"
//!
//! [sinks.file]
//! folder = "/var/spool/ctmx"
//!
//! [runtime]
//! default_domain = "example.com"
//! ```

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::backends::{BhomSinkConfig, ControlMConfig, FileSinkConfig, ItsmSinkConfig};
use crate::enrich::RetryPolicy;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🗓️ No `[control_m]`, no enrichment. Alerts still flow, just with less to say.
    #[serde(default)]
    pub control_m: Option<ControlMConfig>,
    #[serde(default)]
    pub sinks: SinksConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 🕳️ Where envelopes may go. A missing section means that sink is off.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SinksConfig {
    #[serde(default)]
    pub file: Option<FileSinkConfig>,
    #[serde(default)]
    pub itsm: Option<ItsmSinkConfig>,
    #[serde(default)]
    pub bhom: Option<BhomSinkConfig>,
}

impl SinksConfig {
    /// Enabled sink configs only. `enabled = false` is the same as not being there.
    pub fn file(&self) -> Option<&FileSinkConfig> {
        self.file.as_ref().filter(|c| c.enabled)
    }

    pub fn itsm(&self) -> Option<&ItsmSinkConfig> {
        self.itsm.as_ref().filter(|c| c.enabled)
    }

    pub fn bhom(&self) -> Option<&BhomSinkConfig> {
        self.bhom.as_ref().filter(|c| c.enabled)
    }
}

/// ⚙️ Knobs for how hard we try and how many of us try at once.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 🔁 How many times to ask for job output / log before accepting a bad answer
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// ⏱️ The pause before each ask, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// 🧵 Replay workers, each with its own dispatcher
    #[serde(default = "default_replay_parallelism")]
    pub replay_parallelism: usize,
    /// 📬 Replay channel capacity. The reader blocks when it's full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 🧭 Appended to short host names when building FQDNs
    #[serde(default)]
    pub default_domain: Option<String>,
}

fn default_retry_attempts() -> u32 {
    2
}

// 🔧 Control-M needs a couple of seconds to flush the job log after raising the alert.
fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_replay_parallelism() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            replay_parallelism: default_replay_parallelism(),
            queue_capacity: default_queue_capacity(),
            default_domain: None,
        }
    }
}

impl RuntimeConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// 📜 Logging. No file means stderr.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges `CTMX_*` environment variables (nested keys split on `__`, so
/// `CTMX_CONTROL_M__URL` lands in `control_m.url`) with an optional TOML file.
/// The file wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CTMX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CTMX_*). \
             The file exists in our hearts, but apparently not on disk. Or it does, and it's lying.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CTMX_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
