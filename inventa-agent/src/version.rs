//! Snapshot client version marker
//!
//! A plain-text file co-located with the agent binary carries the version
//! every dispatched record is annotated with. Absence is normal and
//! yields a fixed default.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const DEFAULT_CLIENT_VERSION: &str = "0.0.0";
const MARKER_FILE_NAME: &str = "client.version";

fn default_marker_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(MARKER_FILE_NAME)))
}

/// Read the version marker, preferring an explicit override path. Any
/// failure falls back to [`DEFAULT_CLIENT_VERSION`].
pub async fn client_version(marker: Option<&Path>) -> String {
    let path = match marker.map(Path::to_path_buf).or_else(default_marker_path) {
        Some(path) => path,
        None => return DEFAULT_CLIENT_VERSION.to_string(),
    };
    match fs::read_to_string(&path).await {
        Ok(text) => {
            let version = text.trim();
            if version.is_empty() {
                DEFAULT_CLIENT_VERSION.to_string()
            } else {
                version.to_string()
            }
        }
        Err(e) => {
            debug!("no version marker at {} ({}), using default", path.display(), e);
            DEFAULT_CLIENT_VERSION.to_string()
        }
    }
}
