//! 🚦 Dispatch: one alert in, a handful of side effects out.
//!
//! ```text
//!  args ─▶ RawAlert ─▶ normalize ─▶ (Update? ack and stop)
//!                                   │
//!                                   ▼
//!              Control-M login ─▶ analyze ─▶ file ─▶ ITSM ─▶ BHOM ─▶ logout
//!                 (optional)                  │       │
//!                                          Reviewed  comment / Closed
//! ```
//!
//! Every step after normalization is allowed to fail without taking the alert down with it.
//! Failures end up in [`Outcome::failures`] and in the log, and the next step still runs.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::alerts::{
    AlertCategory, ArgStyle, CallType, NO_ORDER_ID, NormalizeContext, RawAlert, normalize,
    parse_alert_args,
};
use crate::app_config::AppConfig;
use crate::backends::bhom::BhomSink;
use crate::backends::controlm::ControlMSession;
use crate::backends::file::FileSink;
use crate::backends::in_mem::InMemorySink;
use crate::backends::itsm::ItsmSink;
use crate::backends::{ControlMConfig, Sink, SinkBackend};
use crate::enrich::{Enricher, Envelope};
use crate::resolver::{HostResolver, SystemResolver};

/// 🏷️ Alert urgency used for every comment we leave on a Control-M alert.
const COMMENT_URGENCY: &str = "Normal";

/// 🎫 What the run counter and the cyclic flag say about opening an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentDecision {
    /// open an incident; close the Control-M alert afterwards when `close_alert`
    Create { close_alert: bool },
    /// no incident, leave this note on the alert instead
    Skip(&'static str),
}

/// 🎫 The incident table.
///
/// | run | cyclic | decision |
/// |-----|--------|----------|
/// | 1   | yes    | incident (the first failure of a cyclic job) |
/// | ≥ 1 | yes    | nothing, the cyclic job already has its incident |
/// | ≥ 1 | no     | incident, then close the alert |
/// | 0   | no     | nothing, the job never actually ran |
pub fn decide_incident(run_counter: u64, cyclic: bool) -> IncidentDecision {
    match (run_counter, cyclic) {
        (1, true) => IncidentDecision::Create { close_alert: false },
        (r, true) if r >= 1 => IncidentDecision::Skip("Processed Alert"),
        (r, false) if r >= 1 => IncidentDecision::Create { close_alert: true },
        (0, false) => IncidentDecision::Skip("Processed Alert without Incident"),
        _ => IncidentDecision::Skip("Processed Alert"),
    }
}

/// 🧾 What happened to one alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub alert_id: String,
    pub call_type: Option<CallType>,
    pub category: Option<AlertCategory>,
    /// the line printed as `Message: ...`
    pub message: String,
    /// the comment left on the Control-M alert, when ITSM ran
    pub notes: Option<String>,
    /// true when a Control-M session was up for this alert
    pub enriched: bool,
    pub file: Option<String>,
    pub incident: Option<String>,
    pub event: Option<String>,
    /// one line per step that failed and was shrugged off
    pub failures: Vec<String>,
}

/// 🚦 Owns the sinks and walks each alert through the pipeline.
#[derive(Debug)]
pub struct AlertDispatcher {
    control_m: Option<ControlMConfig>,
    resolver: Arc<dyn HostResolver>,
    enricher: Enricher,
    style: ArgStyle,
    file: Option<SinkBackend>,
    itsm: Option<SinkBackend>,
    bhom: Option<SinkBackend>,
}

impl AlertDispatcher {
    /// 🚀 Build every enabled sink from config. Fails when a sink can't even be constructed
    /// (unwritable folder, broken TLS stack). Reachability is checked per alert, not here.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let file = match config.sinks.file() {
            Some(file) => Some(SinkBackend::File(FileSink::new(file.clone()).await?)),
            None => None,
        };
        let itsm = match config.sinks.itsm() {
            Some(itsm) => Some(SinkBackend::Itsm(
                ItsmSink::new(itsm.clone()).context("💀 Failed to set up the ITSM sink")?,
            )),
            None => None,
        };
        let bhom = match config.sinks.bhom() {
            Some(bhom) => Some(SinkBackend::Bhom(
                BhomSink::new(bhom.clone()).context("💀 Failed to set up the BHOM sink")?,
            )),
            None => None,
        };
        Ok(Self::with_sinks(config, file, itsm, bhom))
    }

    /// 🧪 Same pipeline, but every enabled sink is swapped for an in-memory stand-in.
    /// Control-M is still asked (read-only calls and alert updates included) when configured.
    pub fn dry_run(config: &AppConfig) -> Self {
        let stand_in = |enabled: bool, name: &'static str| {
            enabled.then(|| SinkBackend::InMemory(InMemorySink::new(name)))
        };
        Self::with_sinks(
            config,
            stand_in(config.sinks.file().is_some(), "file"),
            stand_in(config.sinks.itsm().is_some(), "itsm"),
            stand_in(config.sinks.bhom().is_some(), "bhom"),
        )
    }

    pub(crate) fn with_sinks(
        config: &AppConfig,
        file: Option<SinkBackend>,
        itsm: Option<SinkBackend>,
        bhom: Option<SinkBackend>,
    ) -> Self {
        let jobs = config.control_m.as_ref().map(|c| c.jobs).unwrap_or_default();
        Self {
            control_m: config.control_m.clone(),
            resolver: Arc::new(SystemResolver::new(config.runtime.default_domain.clone())),
            enricher: Enricher::new(jobs, config.runtime.retry_policy()),
            style: ArgStyle::Auto,
            file,
            itsm,
            bhom,
        }
    }

    pub fn with_style(mut self, style: ArgStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// 🚀 Process an alert as Control-M hands it to us: on the command line.
    pub async fn process(&mut self, args: &[String]) -> Result<Outcome> {
        let raw = parse_alert_args(args, self.style);
        self.process_raw(raw).await
    }

    /// 🚀 Process an already-parsed alert.
    pub async fn process_raw(&mut self, raw: RawAlert) -> Result<Outcome> {
        if raw.is_empty() {
            anyhow::bail!("💀 The alert arrived empty. No keys, no values, no clue what Control-M wanted.");
        }

        let datacenters = self
            .control_m
            .as_ref()
            .map(|c| c.datacenters.clone())
            .unwrap_or_default();
        let web_url = self.control_m.as_ref().and_then(ControlMConfig::web_url);
        let ctx = NormalizeContext {
            datacenters: &datacenters,
            web_url: web_url.as_deref(),
            resolver: self.resolver.as_ref(),
        };
        let alert = normalize(&raw, &ctx).await;
        let alert_id = alert.alert_id().to_string();

        let mut outcome = Outcome {
            alert_id: alert_id.clone(),
            call_type: Some(alert.call_type()),
            category: Some(alert.category()),
            ..Outcome::default()
        };

        if alert.call_type() == CallType::Update {
            info!("🔁 Alert {} is an update, nothing to do", alert_id);
            outcome.message = format!("Processed Update Alert: {alert_id}");
            return Ok(outcome);
        }

        let session = self.connect().await;
        outcome.enriched = session.is_some();

        let envelope = self.enricher.analyze(raw, alert, session.as_ref()).await;

        self.write_locally(&envelope, session.as_ref(), &mut outcome).await;
        if self.itsm.is_some() {
            self.open_incident(&envelope, session.as_ref(), &mut outcome).await;
        }
        if let Some(bhom) = self.bhom.as_mut() {
            match bhom.send(&envelope).await {
                Ok(receipt) => outcome.event = Some(receipt.reference),
                Err(err) => {
                    warn!("⚠️ BHOM event for alert {} failed: {:#}", alert_id, err);
                    outcome.failures.push(format!("bhom: {err:#}"));
                }
            }
        }

        if let Some(session) = session {
            if let Err(err) = session.logout().await {
                debug!("👋 Control-M logout failed: {:#}", err);
            }
        }

        outcome.message = format!("Processed New Alert: {alert_id}");
        info!("✅ {}", outcome.message);
        Ok(outcome)
    }

    /// 🗑️ Close every sink. Call once, after the last alert.
    pub async fn close(&mut self) -> Result<()> {
        for sink in [self.file.as_mut(), self.itsm.as_mut(), self.bhom.as_mut()]
            .into_iter()
            .flatten()
        {
            sink.close().await?;
        }
        Ok(())
    }

    /// 🔐 No config or no answer means basic mode. Never an error.
    async fn connect(&self) -> Option<ControlMSession> {
        let config = self.control_m.as_ref()?;
        match ControlMSession::login(config).await {
            Ok(session) => Some(session),
            Err(err) => {
                warn!("⚠️ Control-M API not available, continuing in basic mode: {:#}", err);
                None
            }
        }
    }

    async fn write_locally(&mut self, envelope: &Envelope, session: Option<&ControlMSession>, outcome: &mut Outcome) {
        let alert = &envelope.alert;
        let no_run = alert.category() == AlertCategory::Job
            && alert.order_id() == Some(NO_ORDER_ID)
            && alert.run_counter() == 0;

        let written = if no_run {
            debug!("📁 Alert {} has no job run behind it, skipping the file", alert.alert_id());
            true
        } else if let Some(file) = self.file.as_mut() {
            match file.send(envelope).await {
                Ok(receipt) => {
                    outcome.file = Some(receipt.reference);
                    true
                }
                Err(err) => {
                    warn!("⚠️ Alert {} was not written: {:#}", alert.alert_id(), err);
                    outcome.failures.push(format!("file: {err:#}"));
                    false
                }
            }
        } else {
            false
        };

        if let (true, Some(session)) = (written, session) {
            if let Err(err) = session.update_alert_status(alert.alert_id(), "Reviewed").await {
                warn!("⚠️ {:#}", err);
                outcome.failures.push(format!("control-m: {err:#}"));
            }
        }
    }

    async fn open_incident(&mut self, envelope: &Envelope, session: Option<&ControlMSession>, outcome: &mut Outcome) {
        let Some(itsm) = self.itsm.as_mut() else {
            return;
        };
        let alert_id = envelope.alert.alert_id();
        let decision = decide_incident(envelope.alert.run_counter(), envelope.is_cyclic());
        debug!("🎫 Incident decision for alert {}: {:?}", alert_id, decision);

        let notes = match decision {
            IncidentDecision::Skip(notes) => notes.to_string(),
            IncidentDecision::Create { close_alert } => match itsm.send(envelope).await {
                Ok(receipt) => {
                    let notes = format!("Processed Alert created Incident: {}", receipt.reference);
                    outcome.incident = Some(receipt.reference);
                    if let (true, Some(session)) = (close_alert, session) {
                        if let Err(err) = session.update_alert_status(alert_id, "Closed").await {
                            warn!("⚠️ {:#}", err);
                            outcome.failures.push(format!("control-m: {err:#}"));
                        }
                    }
                    notes
                }
                Err(err) => {
                    warn!("⚠️ Incident for alert {} failed: {:#}", alert_id, err);
                    outcome.failures.push(format!("itsm: {err:#}"));
                    "Processed Alert, incident creation failed".to_string()
                }
            },
        };

        if let Some(session) = session {
            if let Err(err) = session.update_alert(alert_id, &notes, COMMENT_URGENCY).await {
                warn!("⚠️ {:#}", err);
                outcome.failures.push(format!("control-m: {err:#}"));
            }
        }
        outcome.notes = Some(notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{RuntimeConfig, SinksConfig};
    use crate::backends::{CommonHttpConfig, IncidentTemplate, ItsmSinkConfig};
    use crate::enrich::tests::{controlm_config, mount_controlm_job};
    use crate::resolver::StaticResolver;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FAILED_JOB: &str = "call_type: I alert_id: 42 data_center: psctm order_id: 0a1b2 severity: V \
                              message: Ended not OK job_name: NIGHTLY-ETL run_counter: 1";

    fn args(line: &str) -> Vec<String> {
        line.split(' ').map(str::to_string).collect()
    }

    fn quick_config(control_m: Option<ControlMConfig>) -> AppConfig {
        AppConfig {
            control_m,
            sinks: SinksConfig::default(),
            runtime: RuntimeConfig {
                retry_delay_ms: 0,
                ..RuntimeConfig::default()
            },
            ..AppConfig::default()
        }
    }

    struct Rig {
        dispatcher: AlertDispatcher,
        file: InMemorySink,
        itsm: InMemorySink,
        bhom: InMemorySink,
    }

    fn rig(config: &AppConfig, with_itsm: bool) -> Rig {
        let file = InMemorySink::new("file");
        let itsm = InMemorySink::new("itsm");
        let bhom = InMemorySink::new("bhom");
        let dispatcher = AlertDispatcher::with_sinks(
            config,
            Some(SinkBackend::InMemory(file.clone())),
            with_itsm.then(|| SinkBackend::InMemory(itsm.clone())),
            Some(SinkBackend::InMemory(bhom.clone())),
        )
        .with_resolver(Arc::new(StaticResolver::new(None)));
        Rig {
            dispatcher,
            file,
            itsm,
            bhom,
        }
    }

    async fn mount_alert_updates(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/run/alerts/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/run/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "bye"})))
            .mount(server)
            .await;
    }

    #[test]
    fn the_one_where_the_incident_table_holds_up() {
        assert_eq!(decide_incident(1, true), IncidentDecision::Create { close_alert: false });
        assert_eq!(decide_incident(2, true), IncidentDecision::Skip("Processed Alert"));
        assert_eq!(decide_incident(1, false), IncidentDecision::Create { close_alert: true });
        assert_eq!(decide_incident(7, false), IncidentDecision::Create { close_alert: true });
        assert_eq!(decide_incident(0, false), IncidentDecision::Skip("Processed Alert without Incident"));
        assert_eq!(decide_incident(0, true), IncidentDecision::Skip("Processed Alert"));
    }

    #[tokio::test]
    async fn the_one_where_an_update_is_acknowledged_and_nothing_else() {
        let config = quick_config(None);
        let mut rig = rig(&config, true);

        let outcome = rig
            .dispatcher
            .process(&args("call_type: U alert_id: 99 message: Ended not OK"))
            .await
            .expect("💀 process");

        assert_eq!(outcome.message, "Processed Update Alert: 99");
        assert!(rig.file.envelopes().await.is_empty());
        assert!(rig.itsm.envelopes().await.is_empty());
        assert!(rig.bhom.envelopes().await.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_nothing_at_all_is_an_error() {
        let config = quick_config(None);
        let mut rig = rig(&config, false);

        assert!(rig.dispatcher.process(&[]).await.is_err());
    }

    #[tokio::test]
    async fn the_one_where_basic_mode_still_files_the_paperwork() {
        let config = quick_config(None);
        let mut rig = rig(&config, true);

        let outcome = rig.dispatcher.process(&args(FAILED_JOB)).await.expect("💀 process");

        assert_eq!(outcome.message, "Processed New Alert: 42");
        assert!(!outcome.enriched);
        assert_eq!(outcome.file.as_deref(), Some("file-1"));
        assert_eq!(outcome.incident.as_deref(), Some("itsm-1"));
        assert_eq!(outcome.event.as_deref(), Some("bhom-1"));
        assert_eq!(outcome.notes.as_deref(), Some("Processed Alert created Incident: itsm-1"));
        assert!(outcome.failures.is_empty());
        let written = rig.file.envelopes().await;
        assert_eq!(written[0]["jobInfo"][0]["ctm_api"], "not accessible");
    }

    #[tokio::test]
    async fn the_one_where_order_zero_skips_the_file_but_not_the_review() {
        let server = MockServer::start().await;
        mount_controlm_job(&server, false).await;
        Mock::given(method("POST"))
            .and(path("/run/alerts/status"))
            .and(body_partial_json(json!({"status": "Reviewed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_alert_updates(&server).await;
        let config = quick_config(Some(controlm_config(&server)));
        let mut rig = rig(&config, false);

        let outcome = rig
            .dispatcher
            .process(&args(
                "call_type: I alert_id: 43 data_center: psctm order_id: 00000 message: Ended not OK run_counter: 0",
            ))
            .await
            .expect("💀 process");

        assert!(outcome.enriched);
        assert_eq!(outcome.file, None);
        assert!(rig.file.envelopes().await.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_a_regular_job_gets_an_incident_and_a_closed_alert() {
        let server = MockServer::start().await;
        mount_controlm_job(&server, false).await;
        Mock::given(method("POST"))
            .and(path("/run/alerts/status"))
            .and(body_partial_json(json!({"alertIds": [42], "status": "Closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/run/alerts"))
            .and(body_partial_json(json!({
                "alertIds": [42],
                "urgency": "Normal",
                "comment": "Processed Alert created Incident: itsm-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_alert_updates(&server).await;
        let config = quick_config(Some(controlm_config(&server)));
        let mut rig = rig(&config, true);

        let outcome = rig.dispatcher.process(&args(FAILED_JOB)).await.expect("💀 process");

        assert!(outcome.enriched);
        assert_eq!(outcome.incident.as_deref(), Some("itsm-1"));
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        let ticketed = rig.itsm.envelopes().await;
        assert_eq!(ticketed[0]["jobInfo"][0]["entries"][0]["cyclic"], false);
    }

    #[tokio::test]
    async fn the_one_where_a_cyclic_rerun_does_not_open_another_ticket() {
        let server = MockServer::start().await;
        mount_controlm_job(&server, true).await;
        mount_alert_updates(&server).await;
        let config = quick_config(Some(controlm_config(&server)));
        let mut rig = rig(&config, true);

        let outcome = rig
            .dispatcher
            .process(&args(&FAILED_JOB.replace("run_counter: 1", "run_counter: 3")))
            .await
            .expect("💀 process");

        assert_eq!(outcome.incident, None);
        assert_eq!(outcome.notes.as_deref(), Some("Processed Alert"));
        assert!(rig.itsm.envelopes().await.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_the_first_cyclic_failure_gets_a_ticket_but_stays_open() {
        let server = MockServer::start().await;
        mount_controlm_job(&server, true).await;
        Mock::given(method("POST"))
            .and(path("/run/alerts/status"))
            .and(body_partial_json(json!({"status": "Closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/run/alerts"))
            .and(body_partial_json(json!({"comment": "Processed Alert created Incident: itsm-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_alert_updates(&server).await;
        let config = quick_config(Some(controlm_config(&server)));
        let mut rig = rig(&config, true);

        let outcome = rig.dispatcher.process(&args(FAILED_JOB)).await.expect("💀 process");

        assert_eq!(outcome.incident.as_deref(), Some("itsm-1"));
        assert_eq!(outcome.notes.as_deref(), Some("Processed Alert created Incident: itsm-1"));
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        assert_eq!(rig.itsm.envelopes().await.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_itsm_says_no_and_the_alert_stays_open() {
        let controlm = MockServer::start().await;
        mount_controlm_job(&controlm, false).await;
        Mock::given(method("POST"))
            .and(path("/run/alerts/status"))
            .and(body_partial_json(json!({"status": "Closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(0)
            .mount(&controlm)
            .await;
        Mock::given(method("POST"))
            .and(path("/run/alerts"))
            .and(body_partial_json(json!({
                "alertIds": [42],
                "comment": "Processed Alert, incident creation failed"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&controlm)
            .await;
        mount_alert_updates(&controlm).await;

        let itsm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("JWT"))
            .mount(&itsm)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/arsys/v1/entry/HPD:IncidentInterface_Create"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!([{"messageText": "ARERR 9130"}])))
            .expect(1)
            .mount(&itsm)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/jwt/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&itsm)
            .await;
        let itsm_sink = ItsmSink::new(ItsmSinkConfig {
            enabled: true,
            url: itsm.uri(),
            username: "ctm".into(),
            password: "secret".into(),
            api_path: "/api/arsys/v1".into(),
            incident_form: "HPD:IncidentInterface_Create".into(),
            worklog_form: "HPD:WorkLog".into(),
            incident: IncidentTemplate::default(),
            http: CommonHttpConfig::default(),
        })
        .expect("💀 itsm sink");

        let config = quick_config(Some(controlm_config(&controlm)));
        let file = InMemorySink::new("file");
        let mut dispatcher = AlertDispatcher::with_sinks(
            &config,
            Some(SinkBackend::InMemory(file.clone())),
            Some(SinkBackend::Itsm(itsm_sink)),
            None,
        )
        .with_resolver(Arc::new(StaticResolver::new(None)));

        let outcome = dispatcher.process(&args(FAILED_JOB)).await.expect("💀 a failed incident is not a failed alert");

        assert_eq!(outcome.message, "Processed New Alert: 42");
        assert_eq!(outcome.incident, None);
        assert_eq!(outcome.notes.as_deref(), Some("Processed Alert, incident creation failed"));
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].starts_with("itsm:"), "{:?}", outcome.failures);
        assert_eq!(file.envelopes().await.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_the_file_sink_is_real_and_the_dry_run_is_not() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let mut config = quick_config(None);
        config.sinks.file = Some(crate::backends::FileSinkConfig {
            enabled: true,
            folder: dir.path().to_path_buf(),
        });

        let mut real = AlertDispatcher::from_config(&config)
            .await
            .expect("💀 dispatcher")
            .with_resolver(Arc::new(StaticResolver::new(None)));
        let outcome = real.process(&args(FAILED_JOB)).await.expect("💀 process");
        real.close().await.expect("💀 close");
        let path = outcome.file.expect("💀 a file should have been written");
        assert!(std::path::Path::new(&path).exists());

        let mut dry = AlertDispatcher::dry_run(&config).with_resolver(Arc::new(StaticResolver::new(None)));
        let outcome = dry.process(&args(FAILED_JOB)).await.expect("💀 process");
        assert_eq!(outcome.file.as_deref(), Some("file-1"));
        assert_eq!(std::fs::read_dir(dir.path()).expect("💀 read_dir").count(), 1);
    }
}
