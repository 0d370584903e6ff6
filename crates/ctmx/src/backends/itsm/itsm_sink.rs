use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::backends::common_config::api_error_message;
use crate::backends::{CommonHttpConfig, Receipt, Sink};
use crate::common::render_template;
use crate::enrich::Envelope;

/// 🔧 ITSM connection + incident defaults.
///
/// ```toml
/// [sinks.itsm]
/// url = "https://itsm.example.com:8443"
/// username = "ctm-integration"
/// password = "..."
///
/// [sinks.itsm.incident]
/// assigned_group = "Batch Operations"
///
/// [sinks.itsm.incident.fields]
/// "Site" = "{{data_center}}"
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct ItsmSinkConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 📡 `scheme://host:port` of the AR REST endpoint
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_incident_form")]
    pub incident_form: String,
    #[serde(default = "default_worklog_form")]
    pub worklog_form: String,
    #[serde(default)]
    pub incident: IncidentTemplate,
    #[serde(flatten, default)]
    pub http: CommonHttpConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_api_path() -> String {
    "/api/arsys/v1".to_string()
}

fn default_incident_form() -> String {
    "HPD:IncidentInterface_Create".to_string()
}

fn default_worklog_form() -> String {
    "HPD:WorkLog".to_string()
}

/// 📝 The static half of every incident. Whatever the alert doesn't know, this does.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IncidentTemplate {
    pub first_name: String,
    pub last_name: String,
    pub impact: String,
    pub urgency: String,
    pub status: String,
    pub reported_source: String,
    pub service_type: String,
    pub service_ci: String,
    pub assigned_group: String,
    pub support_company: String,
    pub support_organization: String,
    pub op_cat_1: String,
    pub op_cat_2: String,
    pub op_cat_3: String,
    pub prod_cat_1: String,
    pub prod_cat_2: String,
    pub prod_cat_3: String,
    pub product_name: String,
    /// 🪄 Extra incident fields, values are `{{key}}` templates over the alert record.
    pub fields: BTreeMap<String, String>,
}

impl Default for IncidentTemplate {
    fn default() -> Self {
        Self {
            first_name: "Control-M".into(),
            last_name: "Integration".into(),
            impact: "4-Minor/Localized".into(),
            urgency: "4-Low".into(),
            status: "Assigned".into(),
            reported_source: "Systems Management".into(),
            service_type: "Infrastructure Event".into(),
            service_ci: String::new(),
            assigned_group: String::new(),
            support_company: String::new(),
            support_organization: String::new(),
            op_cat_1: "Batch".into(),
            op_cat_2: "Job".into(),
            op_cat_3: "Failed Job".into(),
            prod_cat_1: "Software".into(),
            prod_cat_2: "Workload Automation".into(),
            prod_cat_3: "Control-M".into(),
            product_name: "Control-M".into(),
            fields: BTreeMap::new(),
        }
    }
}

/// 🏷️ `#<job id>#Cyclic#` for cyclic jobs (one ticket for the whole lifecycle),
/// `#<job id>#Regular#<run>#<alert>#` for everything else.
pub(crate) fn vendor_ticket(envelope: &Envelope) -> String {
    let alert = &envelope.alert;
    let job_id = alert.job_id().unwrap_or_default();
    if envelope.is_cyclic() {
        format!("#{job_id}#Cyclic#")
    } else {
        format!(
            "#{}#Regular#{}#{}#",
            job_id,
            alert.get("run_counter").unwrap_or("0"),
            alert.alert_id()
        )
    }
}

/// 🧱 The `values` object of the incident create request.
pub(crate) fn incident_values(template: &IncidentTemplate, envelope: &Envelope) -> Map<String, Value> {
    fn text(v: &str) -> Value {
        Value::String(v.to_string())
    }

    let alert = &envelope.alert;
    let mut values = Map::new();

    values.insert("z1D_Action".into(), text("CREATE"));
    values.insert("First_Name".into(), text(&template.first_name));
    values.insert("Last_Name".into(), text(&template.last_name));
    values.insert("Description".into(), text(alert.summary().unwrap_or_default()));
    values.insert("Detailed_Decription".into(), text(alert.notes().unwrap_or_default()));
    values.insert("Impact".into(), text(&template.impact));
    values.insert("Urgency".into(), text(&template.urgency));
    values.insert("Status".into(), text(&template.status));
    values.insert("Reported Source".into(), text(&template.reported_source));
    values.insert("Service_Type".into(), text(&template.service_type));
    values.insert("ServiceCI".into(), text(&template.service_ci));
    values.insert("Assigned Group".into(), text(&template.assigned_group));
    values.insert("Assigned Support Company".into(), text(&template.support_company));
    values.insert("Assigned Support Organization".into(), text(&template.support_organization));
    values.insert("Categorization Tier 1".into(), text(&template.op_cat_1));
    values.insert("Categorization Tier 2".into(), text(&template.op_cat_2));
    values.insert("Categorization Tier 3".into(), text(&template.op_cat_3));
    values.insert("Product Categorization Tier 1".into(), text(&template.prod_cat_1));
    values.insert("Product Categorization Tier 2".into(), text(&template.prod_cat_2));
    values.insert("Product Categorization Tier 3".into(), text(&template.prod_cat_3));
    values.insert("Product Name".into(), text(&template.product_name));
    values.insert("Vendor Ticket Number".into(), Value::String(vendor_ticket(envelope)));
    values.insert(
        "AWW Custom Field Name".into(),
        Value::String(format!(
            "{}#{}#{}",
            alert.job_name().unwrap_or_default(),
            alert.get("application").unwrap_or_default(),
            alert.get("sub_application").unwrap_or_default()
        )),
    );

    for (field, field_template) in &template.fields {
        let rendered = render_template(field_template, |key| match key {
            "uuid" => Some(envelope.uuid.clone()),
            other => alert.get(other).map(str::to_string),
        });
        values.insert(field.clone(), Value::String(rendered));
    }
    values
}

/// 🎫 Files incidents in BMC Helix ITSM.
#[derive(Debug)]
pub(crate) struct ItsmSink {
    client: reqwest::Client,
    config: ItsmSinkConfig,
}

impl ItsmSink {
    pub(crate) fn new(config: ItsmSinkConfig) -> Result<Self> {
        let client = config.http.build_client()?;
        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn entry_url(&self, form: &str) -> String {
        format!("{}{}/entry/{}", self.base(), self.config.api_path, form)
    }

    /// 🔐 `POST /api/jwt/login` (form encoded). The token comes back as plain text.
    async fn login(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/jwt/login", self.base()))
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .context("💀 Could not reach ITSM to log in")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("💀 ITSM refused the login with '{}': {}", status, api_error_message(&body));
        }
        Ok(body.trim().to_string())
    }

    /// 👋 `POST /api/jwt/logout`. ITSM answers 204 when it's happy.
    async fn logout(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/jwt/logout", self.base()))
            .header("Authorization", format!("AR-JWT {token}"))
            .send()
            .await
            .context("💀 Could not reach ITSM to log out")?;
        if response.status() != reqwest::StatusCode::NO_CONTENT {
            anyhow::bail!("💀 ITSM logout answered '{}' instead of 204", response.status());
        }
        Ok(())
    }

    async fn create_incident(&self, token: &str, envelope: &Envelope) -> Result<String> {
        let body = json!({"values": incident_values(&self.config.incident, envelope)});
        debug!("🎫 Incident payload: {}", body);

        let response = self
            .client
            .post(self.entry_url(&self.config.incident_form))
            .query(&[("fields", "values(Incident Number)")])
            .header("Authorization", format!("AR-JWT {token}"))
            .json(&body)
            .send()
            .await
            .context("💀 The incident request never made it to ITSM")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::CREATED {
            anyhow::bail!(
                "💀 ITSM looked at our incident and said '{}': {}",
                status,
                api_error_message(&text)
            );
        }
        let reply: Value = serde_json::from_str(&text).context("💀 ITSM created something, but the reply wasn't JSON")?;
        reply
            .pointer("/values/Incident Number")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("💀 ITSM created an incident but forgot to tell us its number")
    }

    async fn create_worklog(&self, token: &str, incident: &str, section: &str, content: &Value) -> Result<()> {
        let detail = serde_json::to_string_pretty(content).unwrap_or_default();
        let body = json!({
            "values": {
                "Work Log Submitter": self.config.username,
                "Status": "Enabled",
                "Description": format!("Control-M Log: {section}"),
                "Detailed Description": detail,
                "Incident Number": incident,
                "Work Log Type": "Working Log",
                "View Access": "Public",
                "Secure Work Log": "No",
            }
        });
        let response = self
            .client
            .post(self.entry_url(&self.config.worklog_form))
            .header("Authorization", format!("AR-JWT {token}"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("ITSM answered '{}': {}", status, api_error_message(&text));
        }
        Ok(())
    }

    async fn file_incident(&self, token: &str, envelope: &Envelope) -> Result<String> {
        let incident = self.create_incident(token, envelope).await?;
        info!("🎫 ITSM incident {} created for alert {}", incident, envelope.alert.alert_id());

        for (section, content) in envelope.sections() {
            if let Err(err) = self.create_worklog(token, &incident, section, &content).await {
                warn!("⚠️ Work log '{}' for {} was not attached: {:#}", section, incident, err);
            }
        }
        Ok(incident)
    }
}

#[async_trait]
impl Sink for ItsmSink {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt> {
        let token = self.login().await?;
        let filed = self.file_incident(&token, envelope).await;
        if let Err(err) = self.logout(&token).await {
            warn!("⚠️ ITSM logout failed: {:#}", err);
        }
        Ok(Receipt {
            sink: "itsm",
            reference: filed?,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
