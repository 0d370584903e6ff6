//! 🔬 Enrichment: asking Control-M "so what actually happened?" before telling anyone else.
//!
//! A job alert on its own says "NIGHTLY-ETL failed". The envelope built here says
//! which run, when it started, what it printed, what the log said, and how it's defined.
//! That's the difference between a ticket someone can act on and a ticket someone reassigns.
//!
//! ```text
//! RawAlert + NormalizedAlert ──▶ Enricher::analyze ──▶ Envelope
//!                                   │
//!                                   ├─ job status ─────────────┐
//!                                   ├─ job output ─┐ (join!)   │
//!                                   ├─ job log ────┘           ├─▶ jobInfo / jobOutput / jobLog / jobConfig
//!                                   └─ deployed folder ────────┘
//! ```
//!
//! ⚠️ Enrichment never fails the alert. A section we couldn't fetch says so, in the section.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::{AlertCategory, CallType, NormalizedAlert, RawAlert};
use crate::backends::controlm::controlm_transforms::{
    job_config_collection, job_info_collection, job_log_collection, job_output_collection,
};
use crate::backends::controlm::{Collection, ControlMSession, JobDetailConfig};

/// 📨 Which flavour of envelope is this?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Job,
    Core,
    Infra,
}

impl EnvelopeKind {
    pub fn from_category(category: AlertCategory) -> Self {
        match category {
            AlertCategory::Job => EnvelopeKind::Job,
            AlertCategory::Infrastructure => EnvelopeKind::Infra,
            _ => EnvelopeKind::Core,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Job => "job",
            EnvelopeKind::Core => "core",
            EnvelopeKind::Infra => "infra",
        }
    }

    /// The envelope key the normalized alert lives under.
    pub fn alert_key(&self) -> &'static str {
        match self {
            EnvelopeKind::Job => "jobAlert",
            EnvelopeKind::Core => "coreAlert",
            EnvelopeKind::Infra => "infraAlert",
        }
    }
}

/// 🧾 The four job sections, already rendered to JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSections {
    pub info: Value,
    pub config: Value,
    pub log: Value,
    pub output: Value,
}

impl JobSections {
    fn all(section: Value) -> Self {
        Self {
            info: section.clone(),
            config: section.clone(),
            log: section.clone(),
            output: section,
        }
    }

    /// 🔌 What every section says when the API was not reachable.
    pub fn not_accessible() -> Self {
        Self::all(json!({"ctm_api": "not accessible"}))
    }

    /// 🤷 What every section says when there is no job run to ask about.
    pub fn unknown() -> Self {
        Self::all(Collection::unknown().to_value())
    }
}

/// ✉️ The enriched alert document. This is what gets written, ticketed and evented.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub uuid: String,
    pub kind: EnvelopeKind,
    pub raw: RawAlert,
    pub alert: NormalizedAlert,
    pub job: Option<JobSections>,
    /// true when a Control-M API session was available during enrichment
    pub enriched: bool,
}

impl Envelope {
    /// 📚 Every section as (envelope key, first element). The order work logs get posted in.
    pub fn sections(&self) -> Vec<(&'static str, Value)> {
        let alert = serde_json::to_value(&self.alert).unwrap_or(Value::Null);
        let mut sections = vec![(self.kind.alert_key(), alert)];
        if let Some(job) = &self.job {
            sections.push(("jobInfo", job.info.clone()));
            sections.push(("jobConfig", job.config.clone()));
            sections.push(("jobLog", job.log.clone()));
            sections.push(("jobOutput", job.output.clone()));
        }
        sections
    }

    /// 🔁 Cyclic jobs rerun on a timer. The first job-info entry knows.
    pub fn is_cyclic(&self) -> bool {
        self.job
            .as_ref()
            .and_then(|job| job.info.pointer("/entries/0/cyclic"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn to_json(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert("uuid".into(), Value::String(self.uuid.clone()));
        envelope.insert(
            "raw".into(),
            Value::Array(vec![serde_json::to_value(&self.raw).unwrap_or(Value::Null)]),
        );
        for (key, section) in self.sections() {
            envelope.insert(key.into(), Value::Array(vec![section]));
        }
        Value::Object(envelope)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// 🔁 "Wait a bit, ask, and if the answer is bad, wait and ask again."
///
/// Control-M writes the job log and output a beat after it raises the alert,
/// so the first ask is already delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    async fn run<F, Fut>(&self, what: &str, mut fetch: F) -> Collection
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Collection>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let section = fetch().await;
            if section.is_ok() || attempt >= attempts {
                return section;
            }
            debug!("🔁 {} not ready yet (attempt {}/{}), trying again", what, attempt, attempts);
        }
    }
}

/// 🔬 Builds envelopes.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    jobs: JobDetailConfig,
    retry: RetryPolicy,
}

impl Enricher {
    pub fn new(jobs: JobDetailConfig, retry: RetryPolicy) -> Self {
        Self { jobs, retry }
    }

    /// 🚀 Wrap the alert into an envelope, asking Control-M for job details when it makes sense.
    pub async fn analyze(
        &self,
        raw: RawAlert,
        alert: NormalizedAlert,
        session: Option<&ControlMSession>,
    ) -> Envelope {
        let kind = EnvelopeKind::from_category(alert.category());
        let job = match kind {
            EnvelopeKind::Job => Some(self.job_sections(&alert, session).await),
            _ => None,
        };

        let envelope = Envelope {
            uuid: Uuid::new_v4().to_string(),
            kind,
            raw,
            alert,
            job,
            enriched: session.is_some(),
        };
        info!(
            "🔬 Built {} envelope {} for alert {} (enriched: {})",
            kind.as_str(),
            envelope.uuid,
            envelope.alert.alert_id(),
            envelope.enriched
        );
        envelope
    }

    async fn job_sections(&self, alert: &NormalizedAlert, session: Option<&ControlMSession>) -> JobSections {
        if !alert.has_job_order() || alert.call_type() != CallType::New {
            return JobSections::unknown();
        }
        let Some(session) = session else {
            return JobSections::not_accessible();
        };

        let job_id = alert.job_id().map(str::to_string).unwrap_or_else(|| {
            format!(
                "{}:{}",
                alert.data_center().unwrap_or_default(),
                alert.order_id().unwrap_or_default()
            )
        });
        let job_id = job_id.as_str();

        let info = match session.job_status(job_id).await {
            Ok(reply) => job_info_collection(&reply, job_id),
            Err(err) => {
                warn!("⚠️ Job status for {} unavailable: {:#}", job_id, err);
                Collection::refused(format!("{err:#}"))
            }
        };

        let run_no = alert.run_counter().max(1);
        let log_level = self.jobs.log_level;
        let run_counter = alert.run_counter();
        let (output, log) = futures::join!(
            self.retry.run("job output", || async move {
                match session.job_output(job_id, run_no).await {
                    Ok(reply) => job_output_collection(&reply),
                    Err(err) => Collection::refused(format!("{err:#}")),
                }
            }),
            self.retry.run("job log", || async move {
                match session.job_log(job_id).await {
                    Ok(reply) => job_log_collection(&reply, log_level, run_counter),
                    Err(err) => Collection::refused(format!("{err:#}")),
                }
            }),
        );

        let config = self.job_config(session, alert, &info).await;

        JobSections {
            info: info.to_value(),
            config: config.to_value(),
            log: log.to_value(),
            output: output.to_value(),
        }
    }

    async fn job_config(&self, session: &ControlMSession, alert: &NormalizedAlert, info: &Collection) -> Collection {
        if info.count.unwrap_or(0) < 1 || !info.is_ok() {
            return Collection::nothing_found();
        }
        let first = info.entries.first();
        let field = |name: &str| first.and_then(|e| e.get(name)).and_then(Value::as_str);
        let (Some(folder), Some(server)) = (field("folder"), field("ctm").or(alert.data_center())) else {
            return Collection::nothing_found();
        };
        let job_name = alert.job_name().or(field("name"));

        match session.deployed_folder(server, folder).await {
            Ok(reply) => job_config_collection(&reply, self.jobs.config_level, folder, job_name),
            Err(err) => {
                warn!("⚠️ Deployed folder {} on {} unavailable: {:#}", folder, server, err);
                Collection::refused(format!("{err:#}"))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alerts::{ArgStyle, NormalizeContext, normalize, parse_alert_args};
    use crate::backends::controlm::{ControlMConfig, DetailLevel};
    use crate::backends::CommonHttpConfig;
    use crate::resolver::StaticResolver;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) async fn alert_from(line: &str) -> (RawAlert, NormalizedAlert) {
        let args: Vec<String> = line.split(' ').map(str::to_string).collect();
        let raw = parse_alert_args(&args, ArgStyle::Auto);
        let resolver = StaticResolver::new(None);
        let ctx = NormalizeContext {
            datacenters: &[],
            web_url: None,
            resolver: &resolver,
        };
        let alert = normalize(&raw, &ctx).await;
        (raw, alert)
    }

    fn quick_enricher(log_level: DetailLevel) -> Enricher {
        Enricher::new(
            JobDetailConfig {
                log_level,
                config_level: DetailLevel::Mini,
            },
            RetryPolicy {
                attempts: 2,
                delay: Duration::ZERO,
            },
        )
    }

    pub(crate) async fn mount_controlm_job(server: &MockServer, cyclic: bool) {
        Mock::given(method("POST"))
            .and(path("/session/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/jobs/status"))
            .and(query_param("jobid", "psctm:0a1b2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statuses": [{"jobId": "psctm:0a1b2", "name": "NIGHTLY-ETL", "folder": "FIN",
                              "ctm": "psctm", "cyclic": cyclic, "startTime": "20210416120024"}],
                "total": 1
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/output"))
            .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two\nline three\n"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/log"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "12:48:10 2-Apr-2021  ENDED AT 20210402124810. OSCOMPSTAT 1. RUNCNT 1   \t5100\n",
            ))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/deploy/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "FIN": {"Type": "Folder", "NIGHTLY-ETL": {"Type": "Job:Command", "Command": "etl.sh"}}
            })))
            .mount(server)
            .await;
    }

    pub(crate) fn controlm_config(server: &MockServer) -> ControlMConfig {
        ControlMConfig {
            url: server.uri(),
            username: "u".into(),
            password: "p".into(),
            web_url: None,
            datacenters: vec![],
            jobs: JobDetailConfig::default(),
            http: CommonHttpConfig::default(),
        }
    }

    const FAILED_JOB: &str = "call_type: I alert_id: 42 data_center: psctm order_id: 0a1b2 severity: V \
                              message: Ended not OK job_name: NIGHTLY-ETL run_counter: 1";

    #[tokio::test]
    async fn the_one_where_a_failed_job_gets_the_full_dossier() {
        let server = MockServer::start().await;
        mount_controlm_job(&server, true).await;
        let session = ControlMSession::login(&controlm_config(&server)).await.expect("💀 login");
        let (raw, alert) = alert_from(FAILED_JOB).await;

        let envelope = quick_enricher(DetailLevel::Mini).analyze(raw, alert, Some(&session)).await;

        assert_eq!(envelope.kind, EnvelopeKind::Job);
        assert!(envelope.enriched);
        assert!(envelope.is_cyclic());
        let json = envelope.to_json();
        assert_eq!(json["jobInfo"][0]["count"], 1);
        assert_eq!(json["jobInfo"][0]["entries"][0]["start_time"], "2021-04-16 12:00:24");
        assert_eq!(json["jobOutput"][0]["status"], true);
        assert_eq!(json["jobOutput"][0]["entries"][0]["entry-0002"], "line three");
        assert_eq!(json["jobLog"][0]["entries"][0]["entry-0000"]["oscompstat"], "1");
        assert_eq!(json["jobConfig"][0]["entries"][0]["NIGHTLY-ETL"]["Command"], "etl.sh");
        assert_eq!(json["jobAlert"][0]["alert_id"], "42");
        assert_eq!(json["raw"][0]["order_id"], "0a1b2");
        assert!(json["uuid"].as_str().is_some_and(|u| u.len() == 36));
    }

    #[tokio::test]
    async fn the_one_where_the_log_is_asked_twice_before_giving_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/jobs/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statuses": [], "total": 0})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/log"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": [{"message": "Failed to get job log"}]})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/output"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a\nb\nc\n"))
            .expect(1)
            .mount(&server)
            .await;
        let session = ControlMSession::login(&controlm_config(&server)).await.expect("💀 login");
        let (raw, alert) = alert_from(FAILED_JOB).await;

        let envelope = quick_enricher(DetailLevel::Full).analyze(raw, alert, Some(&session)).await;

        let job = envelope.job.as_ref().expect("💀 job sections");
        assert_eq!(job.log["status"], false);
        assert_eq!(job.info["count"], 0);
        assert_eq!(job.config, Collection::nothing_found().to_value());
        assert!(!envelope.is_cyclic());
    }

    #[tokio::test]
    async fn the_one_where_an_unknown_job_shows_control_ms_own_words() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/jobs/status"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "Job psctm:0a1b2 not found"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/log"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/run/job/psctm:0a1b2/output"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a\nb\nc\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/deploy/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;
        let session = ControlMSession::login(&controlm_config(&server)).await.expect("💀 login");
        let (raw, alert) = alert_from(FAILED_JOB).await;

        let envelope = quick_enricher(DetailLevel::Mini).analyze(raw, alert, Some(&session)).await;

        let job = envelope.job.as_ref().expect("💀 job sections");
        assert_eq!(job.info["status"], false);
        assert_eq!(job.info["entries"][0]["entry-0000"], "Job psctm:0a1b2 not found");
        assert_eq!(job.config, Collection::nothing_found().to_value());
    }

    #[tokio::test]
    async fn the_one_where_the_api_is_down_and_the_envelope_admits_it() {
        let (raw, alert) = alert_from(FAILED_JOB).await;

        let envelope = quick_enricher(DetailLevel::Mini).analyze(raw, alert, None).await;

        assert!(!envelope.enriched);
        assert_eq!(envelope.job, Some(JobSections::not_accessible()));
        assert_eq!(envelope.to_json()["jobLog"][0]["ctm_api"], "not accessible");
    }

    #[tokio::test]
    async fn the_one_where_order_zero_means_nothing_to_ask() {
        let (raw, alert) = alert_from(
            "call_type: I alert_id: 43 data_center: psctm order_id: 00000 message: Ended not OK run_counter: 0",
        )
        .await;

        let envelope = quick_enricher(DetailLevel::Mini).analyze(raw, alert, None).await;

        assert_eq!(envelope.job, Some(JobSections::unknown()));
        assert_eq!(envelope.to_json()["jobInfo"][0], json!({"count": null, "status": null, "entries": []}));
    }

    #[tokio::test]
    async fn the_one_where_core_and_infra_envelopes_travel_light() {
        let (raw, alert) = alert_from("call_type: I alert_id: 44 message: something else").await;
        let core = quick_enricher(DetailLevel::Mini).analyze(raw, alert, None).await;
        assert_eq!(core.kind, EnvelopeKind::Core);
        let json = core.to_json();
        assert!(json.get("coreAlert").is_some());
        assert!(json.get("jobInfo").is_none());
        assert_eq!(core.sections().len(), 1);

        let (raw, alert) = alert_from("Serial: 9 Xtime: 20210413165844 Message: Gateway down").await;
        let infra = quick_enricher(DetailLevel::Mini).analyze(raw, alert, None).await;
        assert_eq!(infra.kind, EnvelopeKind::Infra);
        assert!(infra.to_json().get("infraAlert").is_some());
    }
}
