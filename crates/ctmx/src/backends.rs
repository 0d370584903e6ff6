//! 🔌 Backends: where the real I/O happens.
//!
//! 🗓️ One backend we *ask* things (Control-M), and a handful we *tell* things:
//! a folder on disk, BMC Helix ITSM, BMC Helix Operations Manager, and a Vec in RAM
//! for when we just want to see what would have happened.
//!
//! 🎭 The sinks all speak the same [`Sink`] trait and hide behind one [`SinkBackend`] enum,
//! so the dispatcher never has to know whether an envelope became a file, an incident,
//! or an event. It only gets a [`Receipt`] back. Or an error. Usually a receipt.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use anyhow::Result;
use async_trait::async_trait;

use crate::enrich::Envelope;

pub(crate) mod common_config;
pub mod controlm;
pub(crate) mod bhom;
pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod itsm;

// 🎯 Re-export backend configs so callers can do `backends::FileSinkConfig`
// instead of spelunking into `backends::file::file_sink::FileSinkConfig`.
pub use bhom::BhomSinkConfig;
pub use common_config::CommonHttpConfig;
pub use controlm::{ControlMConfig, DatacenterConfig, DetailLevel, JobDetailConfig};
pub use file::FileSinkConfig;
pub use itsm::{IncidentTemplate, ItsmSinkConfig};

/// 🧾 Proof that a sink did its thing: which sink, and the id / path it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub sink: &'static str,
    pub reference: String,
}

/// 🕳️ Somewhere an envelope can go.
///
/// # Contract 📜
/// - `send` delivers one envelope and returns what the other side called it
///   (a file path, an incident number, an event id).
/// - `close` releases whatever the sink holds. MUST be called. Skipping it is rude.
/// - Deciding *whether* to send is the dispatcher's job, not the sink's.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt>;
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a Sink.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    InMemory(in_mem::InMemorySink),
    File(file::FileSink),
    Itsm(itsm::ItsmSink),
    Bhom(bhom::BhomSink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt> {
        match self {
            SinkBackend::InMemory(sink) => sink.send(envelope).await,
            SinkBackend::File(sink) => sink.send(envelope).await,
            SinkBackend::Itsm(sink) => sink.send(envelope).await,
            SinkBackend::Bhom(sink) => sink.send(envelope).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::InMemory(sink) => sink.close().await,
            SinkBackend::File(sink) => sink.close().await,
            SinkBackend::Itsm(sink) => sink.close().await,
            SinkBackend::Bhom(sink) => sink.close().await,
        }
    }
}
