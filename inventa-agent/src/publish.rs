//! Publisher seam
//!
//! The engine hands every snapshot payload to one publisher selected by
//! provider tag at startup. Transport is the provider's business; the
//! engine never retries and treats failures as opaque.

use crate::producers::SnapshotPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const PROVIDER_FILE: &str = "file";
pub const PROVIDER_LOG: &str = "log";

/// Provider selection and destination, loaded once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub provider: String,
    pub destination: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            provider: PROVIDER_FILE.to_string(),
            destination: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("unknown publish provider: {0}")]
    UnknownProvider(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// External collaborator contract: ship one payload to the configured
/// destination, or fail.
#[async_trait]
pub trait Publisher: Send + Sync + std::fmt::Debug {
    async fn publish(
        &self,
        payload: &SnapshotPayload,
        config: &PublishConfig,
    ) -> Result<(), PublishError>;
}

/// Resolve a provider tag. Unknown tags are a startup error so a typo in
/// the config never silently discards a whole run's snapshots.
pub fn provider_for(tag: &str) -> Result<Box<dyn Publisher>, PublishError> {
    match tag {
        PROVIDER_FILE => Ok(Box::new(FilePublisher)),
        PROVIDER_LOG => Ok(Box::new(LogPublisher)),
        other => Err(PublishError::UnknownProvider(other.to_string())),
    }
}

/// Writes `destination/<instance.key>/<payload.name>` plus a metadata
/// sidecar next to it.
#[derive(Debug)]
pub struct FilePublisher;

impl FilePublisher {
    fn target_dir(payload: &SnapshotPayload, config: &PublishConfig) -> PathBuf {
        let instance = payload
            .metadata
            .get("instance.key")
            .map(String::as_str)
            .unwrap_or("unknown");
        config.destination.join(instance)
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    async fn publish(
        &self,
        payload: &SnapshotPayload,
        config: &PublishConfig,
    ) -> Result<(), PublishError> {
        let dir = Self::target_dir(payload, config);
        let target = dir.join(&payload.name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &payload.data).await?;

        let sidecar = json!({
            "name": payload.name,
            "kind": payload.kind,
            "size": payload.data.len(),
            "metadata": payload.metadata,
        });
        let sidecar_path = sidecar_path(&target);
        fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?).await?;

        debug!("published {} to {}", payload.name, target.display());
        Ok(())
    }
}

fn sidecar_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".meta.json");
    target.with_file_name(name)
}

/// Dry-run provider: logs payload identity and size, ships nothing.
#[derive(Debug)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(
        &self,
        payload: &SnapshotPayload,
        _config: &PublishConfig,
    ) -> Result<(), PublishError> {
        info!(
            "snapshot {} ({}, {} bytes) for {}",
            payload.name,
            payload.kind,
            payload.data.len(),
            payload
                .metadata
                .get("instance.uri")
                .map(String::as_str)
                .unwrap_or("<unknown instance>"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::ProducerKind;
    use tempfile::TempDir;

    fn payload() -> SnapshotPayload {
        let mut payload = SnapshotPayload::new(
            ProducerKind::PropertyFile,
            "conf/db.properties",
            b"user=app".to_vec(),
        );
        payload
            .metadata
            .insert("instance.key".to_string(), "app1".to_string());
        payload
            .metadata
            .insert("instance.uri".to_string(), "/opt/apps/webapps/app1".to_string());
        payload
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = provider_for("carrier-pigeon").unwrap_err();
        assert!(matches!(err, PublishError::UnknownProvider(_)));
    }

    #[test]
    fn test_known_providers_resolve() {
        assert!(provider_for(PROVIDER_FILE).is_ok());
        assert!(provider_for(PROVIDER_LOG).is_ok());
    }

    #[tokio::test]
    async fn test_file_publisher_writes_payload_and_sidecar() {
        let dest = TempDir::new().unwrap();
        let config = PublishConfig {
            provider: PROVIDER_FILE.to_string(),
            destination: dest.path().to_path_buf(),
        };

        FilePublisher.publish(&payload(), &config).await.unwrap();

        let written = dest.path().join("app1").join("conf").join("db.properties");
        assert_eq!(fs::read(&written).await.unwrap(), b"user=app");

        let sidecar = fs::read_to_string(sidecar_path(&written)).await.unwrap();
        let meta: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(meta["kind"], "property-file");
        assert_eq!(meta["size"], 8);
        assert_eq!(meta["metadata"]["instance.key"], "app1");
    }

    #[tokio::test]
    async fn test_log_publisher_always_succeeds() {
        let config = PublishConfig::default();
        LogPublisher.publish(&payload(), &config).await.unwrap();
    }
}
