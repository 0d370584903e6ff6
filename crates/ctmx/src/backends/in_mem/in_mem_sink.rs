use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backends::{Receipt, Sink};
use crate::enrich::Envelope;

/// 📦 A sink that never forgets.
///
/// Every envelope is kept as JSON behind an `Arc<Mutex<..>>`. Clone it before handing it to
/// the dispatcher and you can peek inside afterwards; the `Arc` means everyone shares the same Vec.
#[derive(Debug, Clone)]
pub(crate) struct InMemorySink {
    name: &'static str,
    pub(crate) received: Arc<Mutex<Vec<Value>>>,
}

impl InMemorySink {
    /// 🚀 `name` is what goes on the receipt, so a dry run can stand in for any sink.
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) async fn envelopes(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn send(&mut self, envelope: &Envelope) -> Result<Receipt> {
        let mut received = self.received.lock().await;
        received.push(envelope.to_json());
        Ok(Receipt {
            sink: self.name,
            reference: format!("{}-{}", self.name, received.len()),
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
