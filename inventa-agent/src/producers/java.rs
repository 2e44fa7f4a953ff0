//! Snapshot producers for the Java platform family
//!
//! File-capture producers follow the installation conventions of the
//! platform: contexts under `conf/`, archives at the top level and under
//! `lib/`, property files at the top level and under `conf/`, secured
//! properties under `conf/secure/`, code properties under `classes/`,
//! certificates under `conf/` and `certs/`. The two synthesized
//! producers render run parameters and a host service descriptor as JSON.

use super::{ProduceError, Producer, ProducerKind, SnapshotPayload};
use crate::record::InstanceRecord;
use async_trait::async_trait;
use serde_json::json;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

fn instance_dir(record: &InstanceRecord) -> Result<PathBuf, ProduceError> {
    record.uri().map(PathBuf::from).ok_or(ProduceError::NoUri)
}

/// Files directly under `dir` whose name satisfies `keep`, sorted by
/// name. A missing directory yields an empty set.
async fn matching_files(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, ProduceError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if keep(name) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Capture one file as a payload named by its path relative to the
/// instance directory.
async fn capture(
    kind: ProducerKind,
    base: &Path,
    path: &Path,
) -> Result<SnapshotPayload, ProduceError> {
    let data = fs::read(path).await?;
    let name = path
        .strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    Ok(SnapshotPayload::new(kind, name, data))
}

async fn capture_all(
    kind: ProducerKind,
    base: &Path,
    files: &[PathBuf],
) -> Result<Vec<SnapshotPayload>, ProduceError> {
    let mut payloads = Vec::with_capacity(files.len());
    for path in files {
        payloads.push(capture(kind, base, path).await?);
    }
    Ok(payloads)
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext))
        .unwrap_or(false)
}

/// Web container deployment contexts: every `conf/*.xml`.
pub struct ContainerContextProducer;

#[async_trait]
impl Producer for ContainerContextProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::ContainerContext
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let files = matching_files(&dir.join("conf"), |name| has_extension(name, &["xml"])).await?;
        capture_all(self.kind(), &dir, &files).await
    }
}

/// Run parameters rendered as one JSON payload. `conf/service.toml` is
/// optional; an absent file means the defaults apply.
pub struct ServiceRunParamsProducer;

#[async_trait]
impl Producer for ServiceRunParamsProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::ServiceRunParams
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let path = dir.join("conf").join("service.toml");
        let parameters: toml::Value = match fs::read_to_string(&path).await {
            Ok(text) => toml::from_str(&text).map_err(|e| ProduceError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => toml::Value::Table(toml::map::Map::new()),
            Err(e) => return Err(e.into()),
        };
        let body = json!({
            "instance": record.instance_key(),
            "application": record.application_key(),
            "parameters": parameters,
        });
        let data = serde_json::to_vec_pretty(&body)?;
        Ok(vec![SnapshotPayload::new(
            self.kind(),
            "service-run-params.json",
            data,
        )])
    }
}

/// One JSON descriptor tying the instance to the host service that runs it.
pub struct HostServiceDescriptorProducer;

#[async_trait]
impl Producer for HostServiceDescriptorProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::HostServiceDescriptor
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        // uri is required even though the descriptor is synthesized
        instance_dir(record)?;
        let descriptor = json!({
            "service": record.instance_key(),
            "application": record.application_key(),
            "platform": record.platform(),
            "type": record.app_type(),
            "uri": record.uri(),
            "host": gethostname::gethostname().to_string_lossy(),
        });
        let data = serde_json::to_vec_pretty(&descriptor)?;
        Ok(vec![SnapshotPayload::new(
            self.kind(),
            "host-service-descriptor.json",
            data,
        )])
    }
}

/// Deployable code archives at the top level and under `lib/`.
pub struct CodeArchiveProducer;

#[async_trait]
impl Producer for CodeArchiveProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::CodeArchive
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let is_archive = |name: &str| has_extension(name, &["war", "jar", "ear"]);
        let mut files = matching_files(&dir, is_archive).await?;
        files.extend(matching_files(&dir.join("lib"), is_archive).await?);
        capture_all(self.kind(), &dir, &files).await
    }
}

/// Property files at the top level and under `conf/`.
pub struct PropertyFileProducer;

#[async_trait]
impl Producer for PropertyFileProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::PropertyFile
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let is_properties = |name: &str| has_extension(name, &["properties"]);
        let mut files = matching_files(&dir, is_properties).await?;
        files.extend(matching_files(&dir.join("conf"), is_properties).await?);
        capture_all(self.kind(), &dir, &files).await
    }
}

/// Property files under `conf/secure/`.
pub struct SecurePropertyFileProducer;

#[async_trait]
impl Producer for SecurePropertyFileProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::SecurePropertyFile
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let files = matching_files(&dir.join("conf").join("secure"), |name| {
            has_extension(name, &["properties"])
        })
        .await?;
        capture_all(self.kind(), &dir, &files).await
    }
}

/// Property files shipped inside the code tree, under `classes/`.
pub struct CodePropertyFileProducer;

#[async_trait]
impl Producer for CodePropertyFileProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::CodePropertyFile
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let files = matching_files(&dir.join("classes"), |name| {
            has_extension(name, &["properties"])
        })
        .await?;
        capture_all(self.kind(), &dir, &files).await
    }
}

/// The `run.params` file at the instance root. Required: its absence is a
/// producer failure, handled per step by the dispatcher.
pub struct RunParamsFileProducer;

#[async_trait]
impl Producer for RunParamsFileProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::RunParamsFile
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let path = dir.join("run.params");
        match fs::read(&path).await {
            Ok(data) => Ok(vec![SnapshotPayload::new(self.kind(), "run.params", data)]),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ProduceError::Missing(path)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Certificates under `conf/` (pem, crt) and everything under `certs/`.
pub struct CertificateFileProducer;

#[async_trait]
impl Producer for CertificateFileProducer {
    fn kind(&self) -> ProducerKind {
        ProducerKind::CertificateFile
    }

    async fn produce(&self, record: &InstanceRecord) -> Result<Vec<SnapshotPayload>, ProduceError> {
        let dir = instance_dir(record)?;
        let mut files =
            matching_files(&dir.join("conf"), |name| has_extension(name, &["pem", "crt"])).await?;
        files.extend(matching_files(&dir.join("certs"), |_| true).await?);
        capture_all(self.kind(), &dir, &files).await
    }
}
