//! 🎬 *[Control-M calls the alert script. It hands over a pile of words.]*
//! *["call_type: I alert_id: 208905 message: STATUS OF AGENT PLATFORM ..."]*
//! *[Somewhere in that soup is a structured record. This module goes fishing.]*
//!
//! 📦 Raw alert reconstruction: argv in, ordered key/value record out.
//! Two dialects exist in the wild:
//! - **tokens**: `key:` followed by any number of value words (the Linux alert script style)
//! - **pairs**: strict `key value key value` (what the Windows flavour hands us)
//!
//! 🦆 The duck reads every argument twice, just in case.

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// 🎛️ Which argv dialect are we decoding?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgStyle {
    /// `key:` then value words until the next `key:`
    Tokens,
    /// `key` `value` `key` `value` ...
    Pairs,
    /// 🔮 sniff the argv: any token ending in `:` means tokens, otherwise pairs
    #[default]
    Auto,
}

/// 📦 A raw alert exactly as Control-M described it, keys in arrival order.
///
/// Values are `None` when Control-M sent the key with nothing behind it,
/// which happens a LOT (`memname:`, `run_as:`, `notes:` ... the usual suspects).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlert {
    fields: Vec<(String, Option<String>)>,
}

impl RawAlert {
    /// 🆕 An empty alert. Mostly for tests and builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// 🔧 Insert or replace a field. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// 🔍 Value of a field. `None` both when the key is missing and when it's empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 📥 Rebuild a raw alert from a JSON object (replay files, captured alerts).
    ///
    /// Strings stay strings, numbers and bools are stringified, `null` stays `None`.
    /// Anything nested is a sign someone captured the wrong thing, so we bail.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .context("💀 A raw alert must be a JSON object of key/value pairs. This was something else entirely.")?;

        let mut alert = RawAlert::new();
        for (key, value) in object {
            let value = match value {
                Value::Null => None,
                Value::String(s) => clean_value(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                nested => anyhow::bail!(
                    "💀 Raw alert field '{}' holds a nested value ({}). Alerts are flat. Flat like the earth, according to some.",
                    key,
                    nested
                ),
            };
            alert.insert(key.clone(), value);
        }
        Ok(alert)
    }
}

impl Serialize for RawAlert {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(k, v)| (k, v)))
    }
}

/// 🧹 Strip quotes, trim, and collapse "nothing" into `None`.
fn clean_value(raw: &str) -> Option<String> {
    let cleaned = raw.replace('"', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// 🚀 Turn the alert script argv (program name already removed) into a [`RawAlert`].
pub fn parse_alert_args(args: &[String], style: ArgStyle) -> RawAlert {
    let style = match style {
        ArgStyle::Auto if args.iter().any(|a| a.ends_with(':')) => ArgStyle::Tokens,
        ArgStyle::Auto => ArgStyle::Pairs,
        explicit => explicit,
    };

    match style {
        ArgStyle::Pairs => parse_pairs(args),
        _ => parse_tokens(args),
    }
}

fn parse_tokens(args: &[String]) -> RawAlert {
    let mut alert = RawAlert::new();
    // -- 🎣 (key, words collected so far). Words before the first key have no home and are dropped.
    let mut current: Option<(String, Vec<String>)> = None;

    for token in args {
        if let Some(key) = token.strip_suffix(':') {
            if let Some((key, words)) = current.take() {
                alert.insert(key, clean_value(&words.join(" ")));
            }
            current = Some((key.to_string(), Vec::new()));
        } else if let Some((_, words)) = current.as_mut() {
            // -- commas are the field separator in the scheduler's own rendering, so they become spaces
            words.push(token.trim().replace(',', " "));
        }
    }

    if let Some((key, words)) = current {
        alert.insert(key, clean_value(&words.join(" ")));
    }
    alert
}

fn parse_pairs(args: &[String]) -> RawAlert {
    let mut alert = RawAlert::new();
    for chunk in args.chunks(2) {
        let key = chunk[0].trim_end_matches(':').to_string();
        let value = chunk.get(1).and_then(|v| clean_value(v));
        alert.insert(key, value);
    }
    alert
}
