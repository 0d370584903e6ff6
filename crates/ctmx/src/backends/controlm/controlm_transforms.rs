//! 🔄 Turning Automation API answers into envelope sections.
//!
//! Every section has the same shape, `{"count", "status", "entries"}`, so whoever reads the
//! envelope (a human, a work log, an event) can tell at a glance whether the section
//! is real data (`true`), a refusal (`false`) or simply nothing to say (`null`).

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::controlm_client::{ApiReply, JobStatus, JobStatusPage};
use super::DetailLevel;
use crate::alerts::translate::{format_ctm_timestamp, format_order_date};

/// 🧾 Control-M's "job ended" log code. The line that carries OSCOMPSTAT and RUNCNT.
const JOB_ENDED_CODE: &str = "5100";

/// 📦 `{"count", "status", "entries"}`
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Collection {
    pub count: Option<u64>,
    pub status: Option<bool>,
    pub entries: Vec<Value>,
}

impl Collection {
    /// Nothing asked, nothing known: all nulls.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// We asked, there was nothing there.
    pub fn nothing_found() -> Self {
        Self {
            count: Some(0),
            status: None,
            entries: Vec::new(),
        }
    }

    /// 💀 We asked and got told no. The refusal is the only entry.
    pub fn refused(message: impl Into<String>) -> Self {
        let mut entry = Map::new();
        entry.insert(entry_key(0), Value::String(message.into()));
        Self {
            count: Some(1),
            status: Some(false),
            entries: vec![Value::Object(entry)],
        }
    }

    /// ✅ A section everyone can trust.
    pub fn is_ok(&self) -> bool {
        self.status == Some(true)
    }

    pub fn to_value(&self) -> Value {
        json!({"count": self.count, "status": self.status, "entries": self.entries})
    }
}

/// `entry-0000`, `entry-0001`, ...
pub(crate) fn entry_key(index: usize) -> String {
    format!("entry-{index:04}")
}

fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.replace('\'', ""))
        .collect()
}

/// 📤 Job output: one `entry-NNNN` per non-blank line, all in a single object.
///
/// The status tries to tell "the job printed something" apart from "Control-M couldn't
/// even fetch the output" (which arrives as one or two short apology lines).
pub fn job_output_collection(reply: &ApiReply<String>) -> Collection {
    let text = match reply {
        ApiReply::Fetched(text) => text,
        ApiReply::Rejected(message) => return Collection::refused(message.clone()),
    };

    let lines = clean_lines(text);
    let status = match lines.as_slice() {
        [] => None,
        [only] => Some(!only.contains("Failed")),
        [first, second] => Some(!(first.contains("rejected") && second.contains("USER NOT AUTHORIZED"))),
        _ => Some(true),
    };

    let entries: Map<String, Value> = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| (entry_key(i), Value::String(line)))
        .collect();
    let count = entries.len() as u64;

    Collection {
        count: Some(count),
        status,
        entries: if entries.is_empty() {
            Vec::new()
        } else {
            vec![Value::Object(entries)]
        },
    }
}

/// 📜 One parsed job log line: `12:48:07 2-Apr-2021  ORDERED JOB:24; DAILY FORCED   \t5065`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogLine {
    pub time: String,
    pub date: String,
    pub message: String,
    pub code: String,
}

impl LogLine {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (text, code) = match line.rsplit_once('\t') {
            Some((text, code)) => (text, code.trim()),
            None => (line, ""),
        };
        let mut parts = text.trim_start().splitn(3, char::is_whitespace);
        let time = parts.next()?.to_string();
        let date = parts.next()?.to_string();
        let message = parts.next().unwrap_or_default().trim().to_string();
        Some(Self {
            time,
            date,
            message,
            code: code.to_string(),
        })
    }

    /// 🏁 For `5100` lines: (oscompstat, run count, ended) from
    /// `ENDED AT 20210402124810. OSCOMPSTAT 0. RUNCNT 1`
    pub(crate) fn completion(&self) -> Option<(String, String, String)> {
        if self.code != JOB_ENDED_CODE {
            return None;
        }
        let words: Vec<&str> = self.message.split_whitespace().collect();
        let ended = words.get(2)?.replace('.', "");
        let oscompstat = words.get(4)?.replace('.', "");
        let run_count = words.get(6)?.to_string();
        Some((oscompstat, run_count, format_ctm_timestamp(&ended)))
    }

    fn to_value(&self) -> Value {
        let mut entry = Map::new();
        if let Some((oscompstat, run_count, ended)) = self.completion() {
            entry.insert("oscompstat".into(), Value::String(oscompstat));
            entry.insert("run_count".into(), Value::String(run_count));
            entry.insert("ended".into(), Value::String(ended));
        }
        entry.insert("time".into(), Value::String(self.time.clone()));
        entry.insert("date".into(), Value::String(self.date.clone()));
        entry.insert("message".into(), Value::String(self.message.clone()));
        entry.insert("code".into(), Value::String(self.code.clone()));
        Value::Object(entry)
    }
}

fn wrap_entry(index: usize, value: Value) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(entry_key(index), value);
    Value::Object(wrapper)
}

/// 📜 Job log as a section.
///
/// - `Full`: every line, parsed.
/// - `Mini`: only the `5100` completion line(s) for this run counter.
pub fn job_log_collection(reply: &ApiReply<String>, level: DetailLevel, run_counter: u64) -> Collection {
    let text = match reply {
        ApiReply::Fetched(text) => text,
        ApiReply::Rejected(message) => return Collection::refused(message.clone()),
    };

    let lines = clean_lines(text);
    if let Some(first) = lines.first().filter(|l| l.contains("Failed to get job log")) {
        return Collection::refused(first.clone());
    }

    let parsed: Vec<LogLine> = lines.iter().filter_map(|l| LogLine::parse(l)).collect();
    let kept: Vec<&LogLine> = match level {
        DetailLevel::Full => parsed.iter().collect(),
        DetailLevel::Mini => parsed
            .iter()
            .filter(|line| {
                line.completion()
                    .and_then(|(_, run_count, _)| run_count.parse::<u64>().ok())
                    == Some(run_counter)
            })
            .collect(),
    };

    if parsed.is_empty() {
        return Collection::nothing_found();
    }

    Collection {
        count: Some(kept.len() as u64),
        status: Some(true),
        entries: kept
            .into_iter()
            .enumerate()
            .map(|(i, line)| wrap_entry(i, line.to_value()))
            .collect(),
    }
}

fn job_status_value(job: &JobStatus) -> Value {
    let time = |t: &Option<String>| t.as_deref().map(format_ctm_timestamp);
    json!({
        "job_id": job.job_id,
        "folder_id": job.folder_id,
        "number_of_runs": job.number_of_runs,
        "name": job.name,
        "folder": job.folder,
        "type": job.job_type,
        "status": job.status,
        "held": job.held,
        "deleted": job.deleted,
        "cyclic": job.cyclic,
        "start_time": time(&job.start_time),
        "end_time": time(&job.end_time),
        "estimated_start_time": job.estimated_start_time.first().map(|t| format_ctm_timestamp(t)),
        "estimated_end_time": job.estimated_end_time.first().map(|t| format_ctm_timestamp(t)),
        "order_date": job.order_date.as_deref().map(format_order_date),
        "ctm": job.ctm,
        "description": job.description,
        "host": job.host,
        "application": job.application,
        "sub_application": job.sub_application,
        "output_uri": job.output_uri,
        "log_uri": job.log_uri,
    })
}

/// 📋 Job info: the status record(s) for exactly this `<dc>:<order id>`.
///
/// `count` is what Control-M says it has in total, not how many of those matched.
pub fn job_info_collection(reply: &ApiReply<JobStatusPage>, job_id: &str) -> Collection {
    let page = match reply {
        ApiReply::Fetched(page) => page,
        ApiReply::Rejected(message) => return Collection::refused(message.clone()),
    };

    let entries: Vec<Value> = page
        .statuses
        .iter()
        .filter(|job| job.job_id == job_id)
        .map(job_status_value)
        .collect();

    Collection {
        count: Some(page.total),
        status: Some(true),
        entries,
    }
}

/// 🗂️ Job definition: the whole folder (`Full`) or just `<folder>.<job>` (`Mini`).
pub fn job_config_collection(
    reply: &ApiReply<Value>,
    level: DetailLevel,
    folder: &str,
    job_name: Option<&str>,
) -> Collection {
    let folder_json = match reply {
        ApiReply::Fetched(folder_json) => folder_json,
        ApiReply::Rejected(message) => {
            return Collection {
                count: Some(0),
                status: Some(false),
                entries: vec![json!({"message": message})],
            };
        }
    };

    let job_definition = match (level, job_name) {
        (DetailLevel::Mini, Some(job)) => folder_json.get(folder).and_then(|f| f.get(job)).cloned(),
        _ => None,
    };

    let mut entry = Map::new();
    match job_definition {
        Some(definition) => {
            entry.insert(job_name.unwrap_or_default().to_string(), definition);
        }
        None => {
            entry = folder_json.as_object().cloned().unwrap_or_default();
        }
    }

    Collection {
        count: Some(1),
        status: Some(true),
        entries: vec![Value::Object(entry)],
    }
}
