//! 🗓️ Control-M Automation API: the scheduler that started all of this.
//!
//! We ask it three kinds of questions:
//! - "what happened to this job?" (status, log, output, definition)
//! - "please mark this alert Reviewed / Closed"
//! - "please leave this comment on the alert"
//!
//! and it answers in JSON, plain text, or occasionally a 500 with a haiku in `errors[0].message`.

mod controlm_client;
pub(crate) mod controlm_transforms;

pub use controlm_client::{ApiReply, ControlMSession, JobStatus, JobStatusPage};
pub use controlm_transforms::Collection;

use serde::Deserialize;

use crate::backends::CommonHttpConfig;

/// 🔧 Where the Automation API lives and who we are when we call it.
#[derive(Debug, Deserialize, Clone)]
pub struct ControlMConfig {
    /// 📡 Automation API root, e.g. `https://ctm-em:8443/automation-api`
    pub url: String,
    pub username: String,
    pub password: String,
    /// 🖥️ Control-M web UI root for deep links. Derived from `url` when missing.
    #[serde(default)]
    pub web_url: Option<String>,
    /// 🏢 data center name → server host, for resolving `data_center` in alerts
    #[serde(default)]
    pub datacenters: Vec<DatacenterConfig>,
    #[serde(default)]
    pub jobs: JobDetailConfig,
    #[serde(flatten, default)]
    pub http: CommonHttpConfig,
}

impl ControlMConfig {
    /// 🖥️ The web UI root: configured, or `scheme://host[:port]` of the API url.
    pub fn web_url(&self) -> Option<String> {
        if let Some(web_url) = self.web_url.as_ref().filter(|w| !w.is_empty()) {
            return Some(web_url.trim_end_matches('/').to_string());
        }
        let api = reqwest::Url::parse(&self.url).ok()?;
        let host = api.host_str()?;
        Some(match api.port() {
            Some(port) => format!("{}://{}:{}", api.scheme(), host, port),
            None => format!("{}://{}", api.scheme(), host),
        })
    }
}

/// 🏢 One Control-M server as the EM knows it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatacenterConfig {
    pub name: String,
    #[serde(default)]
    pub host: String,
}

/// 🔬 How much of the job's life story goes into the envelope.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// everything the API returns
    Full,
    /// just the bits about this run
    #[default]
    Mini,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobDetailConfig {
    /// job log: every line (`full`) or only this run's completion line (`mini`)
    #[serde(default)]
    pub log_level: DetailLevel,
    /// job definition: whole folder (`full`) or just this job (`mini`)
    #[serde(default)]
    pub config_level: DetailLevel,
}
