//! 🔤 Control-M speaks in single letters and run-together timestamps.
//! Everybody downstream speaks words. This is the phrasebook.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 📞 Is this a fresh alert or a change to one we already saw?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    New,
    Update,
}

impl CallType {
    /// `I` → New, `U` → Update, anything else → New.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(c) if c.contains('I') => CallType::New,
            Some(c) if c.contains('U') => CallType::Update,
            _ => CallType::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::New => "New",
            CallType::Update => "Update",
        }
    }
}

/// 🚨 How loud should the downstream systems yell?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// `R` → INFO, `U` → MAJOR, `V` → CRITICAL, anything else → INFO.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("R") => Severity::Info,
            Some("U") => Severity::Major,
            Some("V") => Severity::Critical,
            _ => Severity::Info,
        }
    }

    /// 🔁 Read back an already translated severity (the normalized record stores words).
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("OK") => Severity::Ok,
            Some("WARNING") => Severity::Warning,
            Some("MINOR") => Severity::Minor,
            Some("MAJOR") => Severity::Major,
            Some("CRITICAL") => Severity::Critical,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Not_Noticed` → OPEN, `Noticed` → ACK, `Handled` → CLOSED, else OPEN.
///
/// ⚠️ Order matters: "Not_Noticed" contains "Noticed". Ask me how I know.
pub fn translate_status(code: Option<&str>) -> &'static str {
    match code {
        Some(c) if c.contains("Not_Noticed") => "OPEN",
        Some(c) if c.contains("Noticed") => "ACK",
        Some(c) if c.contains("Handled") => "CLOSED",
        _ => "OPEN",
    }
}

/// `R` → Regular, `B` → BMC Batch Impact Manager, else Regular.
pub fn translate_alert_type(code: Option<&str>) -> &'static str {
    match code {
        Some("B") => "BMC Batch Impact Manager",
        _ => "Regular",
    }
}

/// 🕐 `20210413165844` → `2021-04-13 16:58:44`. Too short? Passed through untouched.
pub fn format_ctm_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() < 14 || !raw.is_char_boundary(14) || !raw[..14].bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    format!(
        "{}-{}-{} {}:{}:{}",
        &raw[0..4],
        &raw[4..6],
        &raw[6..8],
        &raw[8..10],
        &raw[10..12],
        &raw[12..14]
    )
}

/// 📅 The calendar part of a Control-M timestamp (`YYYYMMDD`), used in the web UI search link.
pub fn ctm_calendar_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() >= 8 && raw.is_char_boundary(8) && raw[..8].bytes().all(|b| b.is_ascii_digit()) {
        Some(raw[..8].to_string())
    } else {
        None
    }
}

/// 📅 Order dates are `YYMMDD`. We assume the 21st century. Y2.1K is someone else's problem.
pub fn format_order_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    format!("20{}-{}-{}", &raw[0..2], &raw[2..4], &raw[4..6])
}
