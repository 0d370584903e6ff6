use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::alerts::Severity;
use crate::backends::common_config::api_error_message;
use crate::backends::{CommonHttpConfig, Receipt, Sink};
use crate::enrich::Envelope;

/// 🔧 BHOM tenant + access key.
#[derive(Debug, Deserialize, Clone)]
pub struct BhomSinkConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 📡 `https://<tenant>.onbmc.com`
    pub url: String,
    pub access_key: String,
    pub access_secret_key: String,
    pub tenant_id: String,
    #[serde(default = "default_event_class")]
    pub event_class: String,
    #[serde(flatten, default)]
    pub http: CommonHttpConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_event_class() -> String {
    "EVENT".to_string()
}

/// 🚦 Severity → BHOM priority slot. The louder the alert, the smaller the number.
pub(crate) fn event_priority(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "PRIORITY_1",
        Severity::Major => "PRIORITY_2",
        Severity::Minor => "PRIORITY_3",
        Severity::Warning => "PRIORITY_4",
        _ => "PRIORITY_5",
    }
}

/// 📣 Raises events in BHOM.
#[derive(Debug)]
pub(crate) struct BhomSink {
    client: reqwest::Client,
    config: BhomSinkConfig,
}

impl BhomSink {
    pub(crate) fn new(config: BhomSinkConfig) -> Result<Self> {
        let client = config.http.build_client()?;
        Ok(Self { client, config })
    }

    fn events_url(&self) -> String {
        format!("{}/events-service/api/v1.0/events", self.config.url.trim_end_matches('/'))
    }

    async fn login(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/ims/api/v1/access_keys/login", self.config.url.trim_end_matches('/')))
            .json(&json!({
                "access_key": self.config.access_key,
                "access_secret_key": self.config.access_secret_key,
                "tenant_id": self.config.tenant_id,
            }))
            .send()
            .await
            .context("💀 Could not reach BHOM to log in")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("💀 BHOM refused the access key with '{}': {}", status, api_error_message(&body));
        }
        let reply: Value = serde_json::from_str(&body).context("💀 BHOM's login reply wasn't JSON")?;
        reply
            .get("json_web_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("💀 BHOM logged us in but kept the token to itself")
    }

    fn event_for(&self, envelope: &Envelope) -> Value {
        let alert = &envelope.alert;
        let field = |key: &str| alert.get(key).unwrap_or_default().to_string();
        let host = alert
            .get("host_ip_fqdn")
            .or(alert.get("host_id"))
            .or(alert.get("Component_machine"))
            .unwrap_or_default();
        json!([{
            "class": self.config.event_class,
            "severity": alert.severity().as_str(),
            "msg": alert.summary().unwrap_or_default(),
            "details": alert.notes().unwrap_or_default(),
            "status": "OPEN",
            "source_identifier": format!("ctm-alert-{}", alert.alert_id()),
            "source_hostname": host,
            "object": alert.job_name().unwrap_or(host),
            "object_class": alert.category().as_str(),
            "object_uri": field("job_uri"),
            "location": field("data_center"),
        }])
    }

    async fn create_event(&self, token: &str, envelope: &Envelope) -> Result<String> {
        let body = self.event_for(envelope);
        debug!("📣 BHOM event payload: {}", body);
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("💀 The event never made it to BHOM")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("💀 BHOM turned the event down with '{}': {}", status, api_error_message(&text));
        }
        let reply: Value = serde_json::from_str(&text).context("💀 BHOM's event reply wasn't JSON")?;
        reply
            .pointer("/resourceId/0")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("💀 BHOM accepted the event but returned no resourceId")
    }

    async fn set_priority(&self, token: &str, event_id: &str, envelope: &Envelope) -> Result<()> {
        let body = json!({
            "eventIds": [event_id],
            "slots": {
                "priority": event_priority(envelope.alert.severity()),
                "notes": envelope.alert.notes().unwrap_or_default(),
            }
        });
        let response = self
            .client
            .post(format!("{}/operations/setPriority", self.events_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status != reqwest::StatusCode::ACCEPTED {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("BHOM answered '{}': {}", status, api_error_message(&text));
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for BhomSink {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt> {
        let token = self.login().await?;
        let event_id = self.create_event(&token, envelope).await?;
        info!("📣 BHOM event {} raised for alert {}", event_id, envelope.alert.alert_id());

        if let Err(err) = self.set_priority(&token, &event_id, envelope).await {
            warn!("⚠️ BHOM event {} keeps its default priority: {:#}", event_id, err);
        }
        Ok(Receipt {
            sink: "bhom",
            reference: event_id,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
