//! Snapshot producers
//!
//! A producer turns one reconciled instance record into zero or more
//! opaque snapshot payloads. The dispatch engine only knows producer
//! identities and cardinalities; everything about payload content lives
//! behind the [`Producer`] trait.

pub mod java;

use crate::record::InstanceRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Identity of every known producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProducerKind {
    ContainerContext,
    ServiceRunParams,
    HostServiceDescriptor,
    CodeArchive,
    PropertyFile,
    SecurePropertyFile,
    CodePropertyFile,
    RunParamsFile,
    CertificateFile,
}

impl ProducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerKind::ContainerContext => "container-context",
            ProducerKind::ServiceRunParams => "service-run-params",
            ProducerKind::HostServiceDescriptor => "host-service-descriptor",
            ProducerKind::CodeArchive => "code-archive",
            ProducerKind::PropertyFile => "property-file",
            ProducerKind::SecurePropertyFile => "secure-property-file",
            ProducerKind::CodePropertyFile => "code-property-file",
            ProducerKind::RunParamsFile => "run-params-file",
            ProducerKind::CertificateFile => "certificate-file",
        }
    }
}

impl std::fmt::Display for ProducerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One opaque snapshot payload, named uniquely within its instance.
#[derive(Debug, Clone)]
pub struct SnapshotPayload {
    pub name: String,
    pub kind: ProducerKind,
    pub data: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl SnapshotPayload {
    pub fn new(kind: ProducerKind, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("record has no instance.uri")]
    NoUri,
    #[error("required file missing: {0}")]
    Missing(PathBuf),
    #[error("malformed parameter file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// External collaborator contract: produce snapshot payloads for one
/// instance. Producers read live host state and may fail; failures are
/// isolated per step by the dispatcher.
#[async_trait]
pub trait Producer: Send + Sync {
    fn kind(&self) -> ProducerKind;

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError>;
}

/// Registry resolving producer identities to implementations.
pub struct ProducerSet {
    by_kind: HashMap<ProducerKind, Box<dyn Producer>>,
}

impl ProducerSet {
    /// All producers known to this agent build.
    pub fn standard() -> Self {
        let mut set = Self {
            by_kind: HashMap::new(),
        };
        set.register(Box::new(java::ContainerContextProducer));
        set.register(Box::new(java::ServiceRunParamsProducer));
        set.register(Box::new(java::HostServiceDescriptorProducer));
        set.register(Box::new(java::CodeArchiveProducer));
        set.register(Box::new(java::PropertyFileProducer));
        set.register(Box::new(java::SecurePropertyFileProducer));
        set.register(Box::new(java::CodePropertyFileProducer));
        set.register(Box::new(java::RunParamsFileProducer));
        set.register(Box::new(java::CertificateFileProducer));
        set
    }

    pub fn register(&mut self, producer: Box<dyn Producer>) {
        self.by_kind.insert(producer.kind(), producer);
    }

    pub fn get(&self, kind: ProducerKind) -> Option<&dyn Producer> {
        self.by_kind.get(&kind).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
