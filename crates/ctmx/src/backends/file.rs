//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! The alert arrived. The APIs were down. The ticketing system was in a maintenance window.
//! But the disk was there. The disk is always there. Until it's full.
//!
//! This module drops every envelope into a folder as pretty JSON, one file per alert,
//! so that whatever else fails, there's a paper trail. 🦆

mod file_sink;

pub(crate) use file_sink::FileSink;
pub use file_sink::FileSinkConfig;
