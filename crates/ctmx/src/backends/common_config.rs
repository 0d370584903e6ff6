//! 📦 **Common HTTP config**: the shared DNA of every REST backend we talk to.
//!
//! Control-M, ITSM and BHOM all get the same three knobs, flattened into their own
//! config blocks so the TOML stays flat:
//!
//! ```toml
//! [control_m]
//! url = "https://ctm-em:8443/automation-api"
//! tls_verify = false          # on-prem certs. we know. we're sorry.
//! request_timeout_secs = 60
//! ```
//!
//! ⚠️ `tls_verify = false` exists because every one of these products ships with a
//! self-signed cert out of the box. Turn it back on the day someone installs a real one.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// 🔧 Shared HTTP settings, embedded (flattened) by every HTTP backend config.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommonHttpConfig {
    /// ⏱️ How long we wait for the TCP/TLS handshake.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// ⏱️ How long we wait for the whole request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 🔒 Verify server certificates.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

// 🔧 10 seconds to say hello. If the handshake takes longer, the server is not having a good day.
fn default_connect_timeout_secs() -> u64 {
    10
}

// 🔧 30 seconds for a response. Job logs can be chunky.
fn default_request_timeout_secs() -> u64 {
    30
}

fn default_tls_verify() -> bool {
    true
}

impl Default for CommonHttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
        }
    }
}

impl CommonHttpConfig {
    /// 🏗️ Build a `reqwest::Client` with these knobs applied.
    pub(crate) fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .danger_accept_invalid_certs(!self.tls_verify)
            .build()
            .context("💀 The HTTP client refused to be born. We tried to build a reqwest::Client and the TLS stack said 'no'. Probably a cursed system cert store. Either way: tragic.")
    }
}

/// 🔍 Pull `errors[0].message` out of an error body, which is where Control-M
/// (and most of its cousins) hide the one useful sentence.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/errors/0/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
