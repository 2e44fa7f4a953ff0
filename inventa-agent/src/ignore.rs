//! Ignore filter
//!
//! A newline-delimited file of `instance.uri` values. Matching is exact
//! and case-sensitive; a missing file ignores nothing.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    uris: HashSet<String>,
}

impl IgnoreList {
    /// Parse ignore-file contents. Blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Self {
        let uris = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self { uris }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(text) => {
                let list = Self::from_lines(&text);
                info!("loaded {} ignored uris from {}", list.len(), path.display());
                Ok(list)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no ignore file at {}, ignoring nothing", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read ignore file {}", path.display())),
        }
    }

    pub fn is_ignored(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}
