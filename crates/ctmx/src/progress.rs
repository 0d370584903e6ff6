//! 📊 progress.rs: "Are we there yet?", asked of every replay, every time, forever.
//!
//! 🚀 Two jobs. While a replay runs, a progress bar over the bytes of the capture file with a
//! small table of counts underneath. When it's done, a summary table with one row per alert
//! so nobody has to grep the log to find out which ones fell over.
//!
//! ⚠️ Watching this progress bar will not make Control-M answer faster.
//! Neither will refreshing it. We've tried.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};

use crate::dispatch::Outcome;

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS for the replays that should have been a batch job.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Live counters for a replay run.
pub(crate) struct ReplayProgress {
    source_name: String,
    processed: u64,
    failed: u64,
    bytes: u64,
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for ReplayProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar doesn't derive Debug. Diva.
        f.debug_struct("ReplayProgress")
            .field("source_name", &self.source_name)
            .field("processed", &self.processed)
            .field("failed", &self.failed)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl ReplayProgress {
    /// 🚀 `total_size` is the capture file size in bytes, 0 when unknown.
    pub(crate) fn new(source_name: String, total_size: u64) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        // -- the template is a literal; a bad one just falls back to the default bar
        if let Ok(style) = ProgressStyle::default_bar().template("{msg}\n| [{bar:40.cyan/blue}]") {
            progress_bar.set_style(style.progress_chars("=>-"));
        }
        Self {
            source_name,
            processed: 0,
            failed: 0,
            bytes: 0,
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// A progress display that never draws. For tests and `--quiet` moods.
    pub(crate) fn hidden() -> Self {
        let mut progress = Self::new(String::new(), 0);
        progress.progress_bar = ProgressBar::hidden();
        progress
    }

    /// 🔄 One alert finished. `bytes` is how far into the file its line ended.
    pub(crate) fn record(&mut self, ok: bool, bytes: u64) {
        if ok {
            self.processed += 1;
        } else {
            self.failed += 1;
        }
        self.bytes = self.bytes.max(bytes);
        self.render();
        self.progress_bar.set_position(self.bytes);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn render(&self) {
        let elapsed = self.start_time.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            (self.processed + self.failed) as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{:.2} Alerts/s", rate)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} processed", format_number(self.processed)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} failed", format_number(self.failed))).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("replay: {}\n{}", self.source_name, table));
    }
}

/// 🧾 One replayed line and how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    /// 1-based line number in the capture file
    pub line: usize,
    pub outcome: Result<Outcome, String>,
}

impl ReplayRecord {
    pub fn is_ok(&self) -> bool {
        matches!(&self.outcome, Ok(outcome) if outcome.failures.is_empty())
    }
}

/// 📋 Everything a replay did, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub records: Vec<ReplayRecord>,
    pub elapsed: Duration,
}

impl ReplaySummary {
    pub fn processed(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.processed()
    }

    /// 🍽️ The comfy table. One row per line, a totals line at the bottom.
    pub fn render(&self) -> String {
        let dash = || "-".to_string();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Line", "Alert", "Category", "Result", "File", "Incident", "Event", "Problems"]);

        for record in &self.records {
            let row = match &record.outcome {
                Ok(outcome) => vec![
                    Cell::new(record.line).set_alignment(CellAlignment::Right),
                    Cell::new(&outcome.alert_id),
                    Cell::new(outcome.category.map(|c| c.to_string()).unwrap_or_else(dash)),
                    Cell::new(&outcome.message),
                    Cell::new(outcome.file.clone().unwrap_or_else(dash)),
                    Cell::new(outcome.incident.clone().unwrap_or_else(dash)),
                    Cell::new(outcome.event.clone().unwrap_or_else(dash)),
                    Cell::new(outcome.failures.join("\n")),
                ],
                Err(err) => vec![
                    Cell::new(record.line).set_alignment(CellAlignment::Right),
                    Cell::new(dash()),
                    Cell::new(dash()),
                    Cell::new("not processed"),
                    Cell::new(dash()),
                    Cell::new(dash()),
                    Cell::new(dash()),
                    Cell::new(err),
                ],
            };
            table.add_row(row);
        }

        format!(
            "{}\n{} alerts, {} clean, {} with problems, {} elapsed",
            table,
            format_number(self.records.len() as u64),
            format_number(self.processed() as u64),
            format_number(self.failed() as u64),
            format_duration(self.elapsed)
        )
    }
}
