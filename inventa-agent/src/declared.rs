//! Declared inventory loader
//!
//! Administrators can declare instance records as TOML files in one
//! directory, one record per file, keys quoted because they are dotted:
//!
//! ```toml
//! "instance.uri" = "/opt/apps/webapps/shop"
//! "application.key" = "shop-storefront"
//! ```
//!
//! Declared records override discovered ones during reconciliation but
//! never create instances on their own. Files load sorted by file name so
//! the last-declaration-wins tie-break is reproducible across platforms.

use crate::record::InstanceRecord;
use crate::report::{Diagnostic, RunReport};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Load every `*.toml` under `dir`. A missing directory means "nothing
/// declared". Files that fail to parse or lack `instance.uri` are skipped
/// with a diagnostic, never fatal.
pub async fn load_declared(dir: &Path, report: &mut RunReport) -> Result<Vec<InstanceRecord>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("no declared inventory directory at {}", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read declared inventory {}", dir.display()));
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to read entry under {}", dir.display()))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            files.push(path);
        }
    }
    files.sort();

    let mut records = Vec::new();
    for path in files {
        let file = path.display().to_string();
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                report.record(Diagnostic::DeclaredInvalid {
                    file,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let properties: HashMap<String, String> = match toml::from_str(&text) {
            Ok(properties) => properties,
            Err(e) => {
                report.record(Diagnostic::DeclaredInvalid {
                    file,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let record = InstanceRecord::from_properties(properties);
        if record.uri().is_none() {
            report.record(Diagnostic::DeclaredInvalid {
                file,
                reason: "missing instance.uri".to_string(),
            });
            continue;
        }
        records.push(record);
    }

    info!("loaded {} declared records from {}", records.len(), dir.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{KEY_APP_KEY, KEY_INSTANCE_URI};
    use tempfile::TempDir;

    async fn write_file(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_directory_declares_nothing() {
        let mut report = RunReport::new();
        let records = load_declared(Path::new("/nonexistent/declared"), &mut report)
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(report.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_loads_records_sorted_by_file_name() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "20-shop.toml", "\"instance.uri\" = \"/opt/apps/webapps/shop\"\n\"application.key\" = \"later\"\n").await;
        write_file(dir.path(), "10-shop.toml", "\"instance.uri\" = \"/opt/apps/webapps/shop\"\n\"application.key\" = \"earlier\"\n").await;

        let mut report = RunReport::new();
        let records = load_declared(dir.path(), &mut report).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(KEY_APP_KEY), Some("earlier"));
        assert_eq!(records[1].get(KEY_APP_KEY), Some("later"));
    }

    #[tokio::test]
    async fn test_bad_files_are_skipped_with_diagnostics() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "good.toml", "\"instance.uri\" = \"/opt/apps/batch/n\"\n").await;
        write_file(dir.path(), "broken.toml", "not toml at all [[[").await;
        write_file(dir.path(), "no-uri.toml", "\"application.key\" = \"orphan\"\n").await;
        write_file(dir.path(), "ignored.txt", "not inventory").await;

        let mut report = RunReport::new();
        let records = load_declared(dir.path(), &mut report).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(KEY_INSTANCE_URI), Some("/opt/apps/batch/n"));
        let invalid = report
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DeclaredInvalid { .. }))
            .count();
        assert_eq!(invalid, 2);
    }
}
