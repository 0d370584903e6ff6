//! 🚨 Alerts: the raw material of this whole operation.
//!
//! 🎬 *[a job fails in a data center far, far away]*
//! *[Control-M notices. Control-M always notices.]*
//! *[it calls a script with thirty-seven arguments and no explanation]*
//!
//! This module takes those arguments and turns them into something with a shape:
//! - [`args`] rebuilds the key/value record from argv
//! - [`translate`] turns single-letter codes and squashed timestamps into words
//! - [`normalize`] classifies, resolves hosts, and writes the human summary 🦆

pub mod args;
pub mod normalize;
pub mod translate;

pub use args::{ArgStyle, RawAlert, parse_alert_args};
pub use normalize::{AlertCategory, NO_ORDER_ID, NormalizeContext, NormalizedAlert, normalize};
pub use translate::{CallType, Severity};
