use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use super::ControlMConfig;
use crate::backends::common_config::api_error_message;

/// 📬 What a read endpoint handed back: the goods, or a polite (non-2xx) refusal.
///
/// Transport failures are still `Err`. A refusal is data: it ends up in the envelope
/// so whoever reads the ticket sees "Failed to get job log" instead of nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply<T> {
    Fetched(T),
    Rejected(String),
}

/// 📋 One page of `/run/jobs/status`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobStatusPage {
    #[serde(default)]
    pub statuses: Vec<JobStatus>,
    #[serde(default)]
    pub total: u64,
}

/// 📋 A job run as the Automation API describes it.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct JobStatus {
    pub job_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub number_of_runs: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default, rename(deserialize = "type"))]
    pub job_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub held: Option<bool>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub cyclic: Option<bool>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub estimated_start_time: Vec<String>,
    #[serde(default)]
    pub estimated_end_time: Vec<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub ctm: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub sub_application: Option<String>,
    #[serde(default, rename(deserialize = "outputURI"))]
    pub output_uri: Option<String>,
    #[serde(default, rename(deserialize = "logURI"))]
    pub log_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    token: String,
}

/// 🔐 A logged-in Automation API session.
///
/// Built by [`ControlMSession::login`]. Call [`ControlMSession::logout`] when done,
/// Control-M keeps tokens alive for a while and the EM admin will notice.
#[derive(Debug, Clone)]
pub struct ControlMSession {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// Alert ids go over the wire as numbers when they look like numbers.
fn alert_id_value(alert_id: &str) -> Value {
    alert_id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(alert_id))
}

impl ControlMSession {
    /// 🚪 `POST /session/login` and keep the bearer token.
    pub async fn login(config: &ControlMConfig) -> Result<Self> {
        let client = config.http.build_client()?;
        let base_url = config.url.trim_end_matches('/').to_string();
        let login_url = format!("{base_url}/session/login");

        debug!("🔐 Logging into Control-M at {}", login_url);
        let response = client
            .post(&login_url)
            .json(&json!({"username": config.username, "password": config.password}))
            .send()
            .await
            .context("💀 Could not reach the Control-M Automation API to log in. Is the EM up? Is the URL right? Is it Monday?")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Control-M refused the login with '{}': {}",
                status,
                api_error_message(&body)
            );
        }

        let reply: LoginReply = response
            .json()
            .await
            .context("💀 Control-M said yes to the login but the reply had no token in it. Mixed signals.")?;

        Ok(Self {
            client,
            base_url,
            token: reply.token,
        })
    }

    /// 👋 `POST /session/logout`.
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/session/logout", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .context("💀 Failed to reach Control-M to log out. The token will expire on its own, eventually.")?;
        if !response.status().is_success() {
            warn!("⚠️ Control-M logout returned {}", response.status());
        }
        Ok(())
    }

    /// 📋 `GET /run/jobs/status?jobid=<dc>:<order id>`
    pub async fn job_status(&self, job_id: &str) -> Result<ApiReply<JobStatusPage>> {
        let response = self
            .client
            .get(format!("{}/run/jobs/status", self.base_url))
            .query(&[("jobid", job_id)])
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("💀 Failed to ask Control-M about job '{job_id}'"))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            debug!("📭 Control-M refused the job status for '{}' with {}", job_id, status);
            return Ok(ApiReply::Rejected(api_error_message(&body)));
        }
        trace!("📋 job status body: {}", body);
        let page = serde_json::from_str(&body)
            .with_context(|| format!("💀 The job status for '{job_id}' was not the JSON we were promised"))?;
        Ok(ApiReply::Fetched(page))
    }

    /// 📜 `GET /run/job/<job id>/log`
    pub async fn job_log(&self, job_id: &str) -> Result<ApiReply<String>> {
        self.get_text(&format!("{}/run/job/{}/log", self.base_url, job_id), &[])
            .await
    }

    /// 📤 `GET /run/job/<job id>/output?runNo=<n>`
    pub async fn job_output(&self, job_id: &str, run_no: u64) -> Result<ApiReply<String>> {
        let run_no = run_no.to_string();
        self.get_text(
            &format!("{}/run/job/{}/output", self.base_url, job_id),
            &[("runNo", run_no.as_str())],
        )
        .await
    }

    /// 🗂️ `GET /deploy/jobs?format=json&folder=<folder>&server=<server>`
    pub async fn deployed_folder(&self, server: &str, folder: &str) -> Result<ApiReply<Value>> {
        let response = self
            .client
            .get(format!("{}/deploy/jobs", self.base_url))
            .query(&[("format", "json"), ("folder", folder), ("server", server)])
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("💀 Failed to fetch the deployed folder '{folder}' on '{server}'"))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Ok(ApiReply::Rejected(api_error_message(&body)));
        }
        let folder_json = serde_json::from_str(&body)
            .with_context(|| format!("💀 The deployed folder '{folder}' came back as something other than JSON"))?;
        Ok(ApiReply::Fetched(folder_json))
    }

    /// ✅ `POST /run/alerts/status`: Reviewed, Closed, Undelivered, ...
    pub async fn update_alert_status(&self, alert_id: &str, alert_status: &str) -> Result<()> {
        let body = json!({"alertIds": [alert_id_value(alert_id)], "status": alert_status});
        self.post_json("/run/alerts/status", &body)
            .await
            .with_context(|| format!("💀 Failed to set alert {alert_id} to '{alert_status}'"))
    }

    /// 💬 `POST /run/alerts`: comment + urgency on the alert.
    pub async fn update_alert(&self, alert_id: &str, comment: &str, urgency: &str) -> Result<()> {
        let body = json!({
            "alertIds": [alert_id_value(alert_id)],
            "urgency": urgency,
            "comment": comment,
        });
        self.post_json("/run/alerts", &body)
            .await
            .with_context(|| format!("💀 Failed to comment on alert {alert_id}"))
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<ApiReply<String>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("💀 Failed to GET '{url}' from Control-M"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("💀 Failed to read the body of '{url}'"))?;
        if status.is_success() {
            Ok(ApiReply::Fetched(body))
        } else {
            debug!("📭 Control-M refused '{}' with {}", url, status);
            Ok(ApiReply::Rejected(api_error_message(&body)))
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Control-M answered '{}': {}", status, api_error_message(&text));
        }
        trace!("✅ POST {} accepted", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::CommonHttpConfig;
    use crate::backends::controlm::JobDetailConfig;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ControlMConfig {
        ControlMConfig {
            url: format!("{}/automation-api", server.uri()),
            username: "emuser".into(),
            password: "hunter2".into(),
            web_url: None,
            datacenters: vec![],
            jobs: JobDetailConfig::default(),
            http: CommonHttpConfig::default(),
        }
    }

    async fn logged_in(server: &MockServer) -> ControlMSession {
        Mock::given(method("POST"))
            .and(path("/automation-api/session/login"))
            .and(body_json(json!({"username": "emuser", "password": "hunter2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "emuser", "token": "T0K3N", "version": "9.0.21"
            })))
            .mount(server)
            .await;
        ControlMSession::login(&config_for(server))
            .await
            .expect("💀 login against the mock should work")
    }

    #[tokio::test]
    async fn the_one_where_the_login_refusal_explains_itself() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/automation-api/session/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "errors": [{"message": "Login failed: wrong password"}]
            })))
            .mount(&server)
            .await;

        let err = ControlMSession::login(&config_for(&server))
            .await
            .expect_err("💀 a 401 is not a login");
        assert!(err.to_string().contains("Login failed: wrong password"));
    }

    #[tokio::test]
    async fn the_one_where_job_status_comes_back_typed() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/automation-api/run/jobs/status"))
            .and(query_param("jobid", "psctm:0a1b2"))
            .and(header("authorization", "Bearer T0K3N"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statuses": [{
                    "jobId": "psctm:0a1b2", "folderId": "psctm:0a1b1", "numberOfRuns": 3,
                    "name": "NIGHTLY-ETL", "folder": "FIN", "type": "Command",
                    "status": "Ended Not OK", "held": false, "deleted": false, "cyclic": true,
                    "startTime": "20210416120024", "endTime": "20210416120030",
                    "estimatedStartTime": ["20210417120000"], "estimatedEndTime": [],
                    "orderDate": "210416", "ctm": "psctm", "description": "etl",
                    "host": "ag01", "application": "FIN", "subApplication": "GL",
                    "outputURI": "https://x/output", "logURI": "https://x/log"
                }],
                "startIndex": 0, "itemsPerPage": 25, "total": 1, "returned": 1
            })))
            .mount(&server)
            .await;

        let reply = session.job_status("psctm:0a1b2").await.expect("💀 job status");
        let ApiReply::Fetched(page) = reply else {
            panic!("💀 expected a page, got {reply:?}");
        };

        assert_eq!(page.total, 1);
        let job = &page.statuses[0];
        assert_eq!(job.job_id, "psctm:0a1b2");
        assert_eq!(job.cyclic, Some(true));
        assert_eq!(job.number_of_runs, Some(3));
        assert_eq!(job.job_type.as_deref(), Some("Command"));
        assert_eq!(job.sub_application.as_deref(), Some("GL"));
        assert_eq!(job.output_uri.as_deref(), Some("https://x/output"));
        assert_eq!(job.estimated_start_time, vec!["20210417120000".to_string()]);
    }

    #[tokio::test]
    async fn the_one_where_a_missing_log_is_data_not_a_crash() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/automation-api/run/job/psctm:0a1b2/log"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "Failed to get job log"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/automation-api/run/job/psctm:0a1b2/output"))
            .and(query_param("runNo", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello\nworld\n"))
            .mount(&server)
            .await;

        let log = session.job_log("psctm:0a1b2").await.expect("💀 transport ok");
        let output = session.job_output("psctm:0a1b2", 2).await.expect("💀 transport ok");

        assert_eq!(log, ApiReply::Rejected("Failed to get job log".into()));
        assert_eq!(output, ApiReply::Fetched("hello\nworld\n".into()));
    }

    #[tokio::test]
    async fn the_one_where_an_unknown_job_is_a_refusal_not_an_error() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/automation-api/run/jobs/status"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "Job psctm:0a1b2 not found"}]
            })))
            .mount(&server)
            .await;

        let reply = session.job_status("psctm:0a1b2").await.expect("💀 transport ok");

        assert!(matches!(reply, ApiReply::Rejected(ref m) if m == "Job psctm:0a1b2 not found"));
    }

    #[tokio::test]
    async fn the_one_where_alert_updates_use_numeric_ids() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/automation-api/run/alerts/status"))
            .and(body_json(json!({"alertIds": [208905], "status": "Reviewed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/automation-api/run/alerts"))
            .and(body_json(json!({"alertIds": [208905], "urgency": "Normal", "comment": "Processed Alert"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/automation-api/session/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        session.update_alert_status("208905", "Reviewed").await.expect("💀 status update");
        session
            .update_alert("208905", "Processed Alert", "Normal")
            .await
            .expect("💀 comment update");
        session.logout().await.expect("💀 logout");
    }

    #[tokio::test]
    async fn the_one_where_a_rejected_status_update_is_an_error() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/automation-api/run/alerts/status"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "errors": [{"message": "alert not found"}]
            })))
            .mount(&server)
            .await;

        let err = session
            .update_alert_status("1", "Closed")
            .await
            .expect_err("💀 500 should fail");
        let chain = format!("{err:#}");
        assert!(chain.contains("alert not found"), "{chain}");
    }

    #[tokio::test]
    async fn the_one_where_the_deployed_folder_arrives_as_json() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/automation-api/deploy/jobs"))
            .and(query_param("folder", "FIN"))
            .and(query_param("server", "psctm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "FIN": {"Type": "Folder", "NIGHTLY-ETL": {"Type": "Job:Command"}}
            })))
            .mount(&server)
            .await;

        let reply = session.deployed_folder("psctm", "FIN").await.expect("💀 folder");
        match reply {
            ApiReply::Fetched(folder) => assert_eq!(folder["FIN"]["Type"], "Folder"),
            other => panic!("💀 expected a folder, got {other:?}"),
        }
    }
}
