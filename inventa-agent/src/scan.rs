//! Category scanners over the discovery root
//!
//! One scanner per (platform, application type) pair, each bound to a
//! conventional subdirectory of the discovery root. Scanners run in a
//! fixed order and append into a single shared list, so accumulation
//! order is a documented invariant rather than an accident.

use crate::record::{
    InstanceRecord, KEY_APP_KEY, KEY_APP_TYPE, KEY_INSTANCE_KEY, KEY_INSTANCE_URI, KEY_PLATFORM,
    PLATFORM_JAVA, TYPE_BATCH, TYPE_SERVICE, TYPE_WEB,
};
use crate::report::{Diagnostic, RunReport};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// One installation-directory convention.
#[derive(Debug, Clone, Copy)]
pub struct CategoryScanner {
    pub platform: &'static str,
    pub app_type: &'static str,
    pub subdir: &'static str,
}

/// Fixed scan order: web-hosted, then background services, then batch jobs.
pub const SCANNERS: &[CategoryScanner] = &[
    CategoryScanner {
        platform: PLATFORM_JAVA,
        app_type: TYPE_WEB,
        subdir: "webapps",
    },
    CategoryScanner {
        platform: PLATFORM_JAVA,
        app_type: TYPE_SERVICE,
        subdir: "services",
    },
    CategoryScanner {
        platform: PLATFORM_JAVA,
        app_type: TYPE_BATCH,
        subdir: "batch",
    },
];

impl CategoryScanner {
    /// Scan `root/<subdir>` and append one record per immediate
    /// subdirectory. A missing category directory is not an error, it
    /// just contributes zero instances. Records already in `records` are
    /// never touched.
    pub async fn scan(
        &self,
        root: &Path,
        records: &mut Vec<InstanceRecord>,
        report: &mut RunReport,
    ) -> Result<()> {
        let dir = root.join(self.subdir);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no {} directory under {}, skipping", self.subdir, root.display());
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to scan {}", dir.display()));
            }
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to read entry under {}", dir.display()))?
        {
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;
            if file_type.is_dir() {
                found.push(entry.path());
            }
        }
        // read_dir order is platform-dependent; sort for reproducible output
        found.sort();

        for path in found {
            let Some(leaf) = path.file_name().and_then(|name| name.to_str()) else {
                warn!("skipping non-UTF-8 directory name under {}", dir.display());
                continue;
            };

            let mut record = InstanceRecord::new();
            record.set(KEY_PLATFORM, self.platform);
            record.set(KEY_APP_TYPE, self.app_type);
            record.set(KEY_APP_KEY, leaf);
            record.set(KEY_INSTANCE_URI, path.display().to_string());
            // Structurally impossible on a fresh record; kept as a defensive
            // invariant check that must not halt the run.
            if !record.init(KEY_INSTANCE_KEY, leaf) {
                report.record(Diagnostic::DuplicateKey {
                    uri: path.display().to_string(),
                    key: KEY_INSTANCE_KEY.to_string(),
                });
            }

            debug!("discovered {} instance: {}", self.app_type, path.display());
            records.push(record);
        }

        Ok(())
    }
}

/// Run every scanner in table order over one discovery root.
pub async fn discover_all(root: &Path, report: &mut RunReport) -> Result<Vec<InstanceRecord>> {
    let mut records = Vec::new();
    for scanner in SCANNERS {
        scanner.scan(root, &mut records, report).await?;
    }
    info!("discovery complete: {} instances under {}", records.len(), root.display());
    Ok(records)
}
