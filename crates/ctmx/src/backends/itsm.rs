//! 🎫 BMC Helix ITSM (the AR System REST API), where alerts go to become somebody's problem.
//!
//! One `send` is one incident: log in, file the incident, attach a work log per envelope
//! section, log out. Work logs are nice to have; the incident is the point.

mod itsm_sink;

pub use itsm_sink::{IncidentTemplate, ItsmSinkConfig};
pub(crate) use itsm_sink::ItsmSink;
