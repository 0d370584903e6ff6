//! 🧪 Normalization: where a raw alert goes in as a pile of strings and comes out
//! as a record that knows what it is.
//!
//! Every key Control-M sent survives (translated where we know the code), and a handful
//! of derived keys get bolted on: host resolution, the category, a human summary and notes,
//! and for jobs a `job_id` plus a deep link into the Control-M web UI.
//!
//! 🎯 Classification is first-match-wins over the `message` text. It is string matching.
//! It is not glamorous. It has been paging people since 2021.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

use super::args::RawAlert;
use super::translate::{
    CallType, Severity, ctm_calendar_date, format_ctm_timestamp, translate_alert_type,
    translate_status,
};
use crate::backends::DatacenterConfig;
use crate::resolver::{HostInfo, HostResolver};

/// 🏷️ CMDB class prefix used for the `system_class` alias.
const CDM_CLASS: &str = "BMC_ApplicationService";

/// 🚫 The order id Control-M uses when there is no job behind the alert.
pub const NO_ORDER_ID: &str = "00000";

/// 🗂️ What kind of trouble is this?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertCategory {
    /// a job failed, failed to order, or tripped a BIM/SIM service
    Job,
    /// an agent came or went
    Agent,
    /// a whole data center came or went
    Datacenter,
    /// Control-M/EM itself is unwell (X-alerts, configuration agent)
    Infrastructure,
    /// everything else
    Core,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Job => "job",
            AlertCategory::Agent => "agent",
            AlertCategory::Datacenter => "datacenter",
            AlertCategory::Infrastructure => "infrastructure",
            AlertCategory::Core => "core",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 🧰 Everything normalization needs from the outside world.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub datacenters: &'a [DatacenterConfig],
    /// Control-M web UI root, e.g. `https://ctm-em:8443`
    pub web_url: Option<&'a str>,
    pub resolver: &'a dyn HostResolver,
}

/// 📦 The normalized alert: a sorted record for the wire, plus the typed bits the
/// dispatcher makes decisions on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAlert {
    record: BTreeMap<String, Option<String>>,
    alert_id: String,
    call_type: CallType,
    category: AlertCategory,
    severity: Severity,
    run_counter: u64,
}

impl Serialize for NormalizedAlert {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl NormalizedAlert {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.record.get(key).and_then(|v| v.as_deref())
    }

    /// `alert_id`, or `Serial` for X-alerts.
    pub fn alert_id(&self) -> &str {
        &self.alert_id
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    pub fn category(&self) -> AlertCategory {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Missing, empty or non-numeric run counters count as 0.
    pub fn run_counter(&self) -> u64 {
        self.run_counter
    }

    pub fn data_center(&self) -> Option<&str> {
        self.get("data_center")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.get("order_id")
    }

    /// ✅ True when there is a real job run behind this alert worth asking the API about.
    pub fn has_job_order(&self) -> bool {
        matches!(self.order_id(), Some(oid) if oid != NO_ORDER_ID)
    }

    pub fn job_name(&self) -> Option<&str> {
        self.get("job_name")
    }

    pub fn job_id(&self) -> Option<&str> {
        self.get("job_id")
    }

    pub fn summary(&self) -> Option<&str> {
        self.get("message_summary")
    }

    pub fn notes(&self) -> Option<&str> {
        self.get("message_notes")
    }
}

/// 🩺 What the `message` text told us.
#[derive(Debug, Default)]
struct MessageVerdict {
    category: Option<AlertCategory>,
    host_name: Option<String>,
    agent_state: Option<String>,
    datacenter_state: Option<String>,
    failed_job: bool,
}

fn read_message(message: &str) -> MessageVerdict {
    let words: Vec<&str> = message.split_whitespace().collect();
    let word = |i: usize| words.get(i).map(|w| w.to_string());

    if message.contains("STATUS OF AGENT PLATFORM") {
        MessageVerdict {
            category: Some(AlertCategory::Agent),
            host_name: word(4),
            agent_state: word(7),
            ..Default::default()
        }
    } else if message.contains("DATA CENTER") {
        MessageVerdict {
            category: Some(AlertCategory::Datacenter),
            host_name: word(2),
            datacenter_state: word(4),
            ..Default::default()
        }
    } else if message.contains("Distributed Control-M/EM Configuration Agent") {
        MessageVerdict {
            category: Some(AlertCategory::Infrastructure),
            host_name: word(2),
            ..Default::default()
        }
    } else if message.contains("Ended not OK")
        || message.contains("Failed to order")
        || message.contains("BIM / SIM")
    {
        MessageVerdict {
            category: Some(AlertCategory::Job),
            failed_job: true,
            ..Default::default()
        }
    } else {
        MessageVerdict::default()
    }
}

fn class_alias(host: &str, info: &HostInfo) -> String {
    format!("{}:{}:{}", CDM_CLASS, host, info.domain.as_deref().unwrap_or_default())
}

/// 🚀 Normalize a raw alert into a [`NormalizedAlert`].
pub async fn normalize(raw: &RawAlert, ctx: &NormalizeContext<'_>) -> NormalizedAlert {
    let mut record: BTreeMap<String, Option<String>> = BTreeMap::new();
    let data_center = raw.get("data_center").map(str::to_string);

    let mut category: Option<AlertCategory> = None;
    let mut update_date: Option<String> = None;
    let mut job_script: Option<String> = None;
    let mut job_order: Option<String> = None;
    let mut host = HostInfo::default();
    let mut data_center_host = HostInfo::default();
    let mut system_class: Option<String> = None;
    let mut system_status: Option<String> = None;
    let mut summary: Option<String> = None;
    let mut notes: Option<String> = None;

    // ===== pass 1: translate codes, resolve hosts =====
    for (key, value) in raw.iter() {
        let mut value = value.map(str::to_string);
        match key {
            "call_type" => value = Some(CallType::from_code(value.as_deref()).as_str().to_string()),
            "send_time" | "last_time" => {
                if let Some(v) = value.take() {
                    update_date = ctm_calendar_date(&v).or(update_date);
                    value = Some(format_ctm_timestamp(&v));
                }
            }
            "Xtime" => {
                value = value.map(|v| format_ctm_timestamp(&v));
                category = Some(AlertCategory::Infrastructure);
            }
            "Xtime_of_last" => value = value.map(|v| format_ctm_timestamp(&v)),
            "memname" => job_script = value.clone().filter(|v| v != "None"),
            "alert_type" => value = Some(translate_alert_type(value.as_deref()).to_string()),
            "severity" => value = Some(Severity::from_code(value.as_deref()).as_str().to_string()),
            "status" => value = Some(translate_status(value.as_deref()).to_string()),
            "run_counter" => {
                if value.is_some() {
                    job_order = raw.get("order_id").map(str::to_string);
                }
            }
            "data_center" => {
                let configured_host = value.as_deref().and_then(|dc| {
                    ctx.datacenters
                        .iter()
                        .find(|d| d.name == dc)
                        .map(|d| d.host.clone())
                });
                if let Some(dc_host) = configured_host.filter(|h| !h.is_empty()) {
                    data_center_host = ctx.resolver.resolve(&dc_host).await;
                }
            }
            "host_id" => {
                if let Some(h) = value.as_deref() {
                    host = ctx.resolver.resolve(h).await;
                }
            }
            "Component_machine" => {
                if let Some(machine) = value.as_deref() {
                    host = ctx.resolver.resolve(machine).await;
                    system_class = Some(class_alias(machine, &host));
                }
            }
            _ => {}
        }
        trace!("🔤 alert field {} = {:?}", key, value);
        record.insert(key.to_string(), value);
    }

    // ===== pass 2: read the message text =====
    let job_name = raw.get("job_name");
    let run_counter_raw = raw.get("run_counter").unwrap_or("0");
    let dc_label = data_center.as_deref().unwrap_or_default();
    let mut verdict = MessageVerdict::default();

    if let Some(message) = raw.get("message") {
        verdict = read_message(message);
        if let Some(host_name) = verdict.host_name.as_deref() {
            host = ctx.resolver.resolve(host_name).await;
            system_class = Some(class_alias(host_name, &host));
        }
        if verdict.category.is_some() {
            category = verdict.category;
        }

        if verdict.failed_job {
            job_order = raw.get("order_id").map(str::to_string);
            let job_run = format!("{}:{}", dc_label, job_order.as_deref().unwrap_or_default());
            system_status = Some("failed".to_string());
            match job_name {
                Some(name) => {
                    summary = Some(format!("Job {name} failed"));
                    notes = Some(format!(
                        "CTRL-M Job {name} failed. Job ID: {job_run} with Job Run Count: {run_counter_raw}"
                    ));
                }
                None => {
                    summary = Some(message.to_string());
                    notes = Some(format!(
                        "CTRL-M Job failed. Job ID: {job_run} with Job Run Count: {run_counter_raw}"
                    ));
                }
            }
        } else {
            summary = Some(message.to_string());
            notes = Some(message.to_string());
        }
    }

    if let Some(component_message) = raw.get("Message") {
        summary = Some(component_message.to_string());
        notes = Some(format!(
            "CTRL-M Component {}. Managed by: {}",
            component_message,
            host.domain.as_deref().unwrap_or_default()
        ));
    }

    // ===== pass 3: agent / datacenter state overrides =====
    let host_name = verdict.host_name.as_deref().unwrap_or_default();
    let host_fqdn = host.fqdn.as_deref().unwrap_or(host_name).to_string();

    if let Some(state) = verdict.agent_state.as_deref() {
        if state.contains("UNAVAILABLE") {
            record.insert("severity".into(), Some(Severity::Major.as_str().into()));
            summary = Some(format!("Agent on {host_name} not available"));
            notes = Some(format!(
                "CTRL-M Agent on {host_fqdn} down or not available. Managed by: {dc_label}"
            ));
            system_status = Some("unavailable".into());
        } else if state.contains("AVAILABLE") {
            record.insert("severity".into(), Some(Severity::Ok.as_str().into()));
            summary = Some(format!("Agent on {host_name} available"));
            notes = Some(format!("CTRL-M Agent on {host_fqdn} available. Managed by: {dc_label}"));
            system_status = Some("available".into());
        }
    }

    if let Some(state) = verdict.datacenter_state.as_deref() {
        if state.contains("DISCONNECTED") {
            record.insert("severity".into(), Some(Severity::Critical.as_str().into()));
            summary = Some(format!("Data Center {dc_label} was disconnected"));
            notes = Some(format!(
                "CTRL-M Data Center {dc_label} on {host_fqdn} down or disconnected."
            ));
            system_status = Some("disconnected".into());
        } else if state.contains("CONNECTED") {
            record.insert("severity".into(), Some(Severity::Ok.as_str().into()));
            summary = Some(format!("Data Center on {host_name} available"));
            notes = Some(format!(
                "CTRL-M Data Center {dc_label} on {host_fqdn} available or connected."
            ));
            system_status = Some("connected".into());
        }
    }

    // ===== pass 4: job identity + deep link =====
    if let Some(order_id) = job_order.as_deref().filter(|oid| *oid != NO_ORDER_ID) {
        record.insert("job_id".into(), Some(format!("{dc_label}:{order_id}")));
        let job_uri = ctx.web_url.map(|web| {
            format!(
                "{}/ControlM/#Search:id=Search_2&search={}&date={}&controlm={}",
                web.trim_end_matches('/'),
                order_id,
                update_date.as_deref().unwrap_or_default(),
                dc_label
            )
        });
        record.insert("job_uri".into(), job_uri);
    }

    let category = category.unwrap_or(AlertCategory::Core);
    record.insert("data_center_ip".into(), data_center_host.ip);
    record.insert("data_center_fqdn".into(), data_center_host.fqdn);
    record.insert("data_center_dns".into(), data_center_host.domain);
    record.insert("host_ip".into(), host.ip);
    record.insert("host_ip_fqdn".into(), host.fqdn);
    record.insert("host_ip_dns".into(), host.domain);
    record.insert("system_category".into(), Some(category.as_str().into()));
    record.insert("system_status".into(), system_status);
    record.insert("system_class".into(), system_class);
    record.insert("job_script".into(), job_script);
    record.insert("message_summary".into(), summary);
    record.insert("message_notes".into(), notes);

    let alert_id = raw
        .get("alert_id")
        .or_else(|| raw.get("Serial"))
        .unwrap_or("0")
        .to_string();
    let call_type = CallType::from_code(raw.get("call_type"));
    let severity = Severity::from_label(record.get("severity").and_then(|v| v.as_deref()));
    let run_counter = raw
        .get("run_counter")
        .and_then(|rc| rc.trim().parse::<u64>().ok())
        .unwrap_or(0);

    debug!(
        "🧪 Normalized alert {} as {} ({}), run counter {}",
        alert_id, category, severity, run_counter
    );

    NormalizedAlert {
        record,
        alert_id,
        call_type,
        category,
        severity,
        run_counter,
    }
}
