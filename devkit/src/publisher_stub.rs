/*!
Recording publisher for tests

Stands in for a real publish provider: every payload is kept in memory
for assertions, and individual producer kinds can be made to fail to
exercise the engine's per-payload isolation.
*/

use async_trait::async_trait;
use inventa_agent::producers::SnapshotPayload;
use inventa_agent::publish::{PublishConfig, PublishError, Publisher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use tracing::debug;

/// One payload as the publisher saw it.
#[derive(Debug, Clone)]
pub struct PublishedSnapshot {
    pub name: String,
    pub kind: String,
    pub data: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

/// Publisher stub that records instead of shipping.
#[derive(Clone, Default, Debug)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<PublishedSnapshot>>>,
    failing_kinds: Arc<Mutex<HashSet<String>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every payload of this producer kind fail to publish.
    pub fn fail_kind(&self, kind: &str) {
        self.failing_kinds.lock().insert(kind.to_string());
    }

    /// Everything published so far, in publish order.
    pub fn published(&self) -> Vec<PublishedSnapshot> {
        self.published.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn by_kind(&self, kind: &str) -> Vec<PublishedSnapshot> {
        self.published
            .lock()
            .iter()
            .filter(|snapshot| snapshot.kind == kind)
            .cloned()
            .collect()
    }

    /// Parse the most recent payload of a kind as JSON (for the
    /// synthesized descriptor producers).
    pub fn last_json(&self, kind: &str) -> Option<serde_json::Value> {
        self.by_kind(kind)
            .last()
            .and_then(|snapshot| serde_json::from_slice(&snapshot.data).ok())
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        payload: &SnapshotPayload,
        _config: &PublishConfig,
    ) -> Result<(), PublishError> {
        let kind = payload.kind.to_string();
        if self.failing_kinds.lock().contains(&kind) {
            return Err(PublishError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected publish failure",
            )));
        }
        debug!("[stub] recorded {} ({} bytes)", payload.name, payload.data.len());
        self.published.lock().push(PublishedSnapshot {
            name: payload.name.clone(),
            kind,
            data: payload.data.clone(),
            metadata: payload.metadata.clone(),
        });
        Ok(())
    }
}
