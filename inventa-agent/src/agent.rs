//! The agent: one full inventory run
//!
//! Scan, reconcile, dispatch, report. The run is sequential end-to-end
//! and best-effort: per-instance and per-step failures are collected on
//! the report instead of aborting the pass.

use crate::config::AgentConfig;
use crate::declared::load_declared;
use crate::dispatch::Dispatcher;
use crate::ignore::IgnoreList;
use crate::producers::ProducerSet;
use crate::publish::{self, Publisher};
use crate::reconcile::reconcile;
use crate::record::KEY_CLIENT_VERSION;
use crate::report::RunReport;
use crate::scan::discover_all;
use crate::version::client_version;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

pub struct Agent {
    config: AgentConfig,
    dispatcher: Dispatcher,
}

impl Agent {
    /// Wire up the configured publish provider and the standard producer
    /// set. An unknown provider tag fails here, before any scanning.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let publisher = publish::provider_for(&config.publish.provider)
            .with_context(|| format!("cannot select publish provider '{}'", config.publish.provider))?;
        Ok(Self::with_publisher(config, publisher))
    }

    /// Seam for tests and embedders that bring their own publisher.
    pub fn with_publisher(config: AgentConfig, publisher: Box<dyn Publisher>) -> Self {
        let dispatcher = Dispatcher::new(ProducerSet::standard(), publisher, config.publish.clone());
        Self { config, dispatcher }
    }

    /// Execute one inventory pass and return its report.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::new();
        let root = self.discovery_root()?;
        info!("starting inventory run under {}", root.display());

        let discovered = discover_all(&root, &mut report).await?;
        report.discovered = discovered.len();

        let declared = load_declared(&self.config.declared.dir, &mut report).await?;
        report.declared_loaded = declared.len();

        let ignore = IgnoreList::load(&self.config.ignore.file).await?;

        let canonical = reconcile(discovered, &declared, &ignore, &mut report);
        report.canonical = canonical.len();

        let version = client_version(self.config.snapshot.version_marker.as_deref()).await;
        for mut record in canonical {
            record.set(KEY_CLIENT_VERSION, version.as_str());
            self.dispatcher.dispatch(&record, &mut report).await;
        }

        report.finish();
        info!("{}", report.summary());
        Ok(report)
    }

    /// Scanners need an absolute root so `instance.uri` values are
    /// absolute paths.
    fn discovery_root(&self) -> Result<PathBuf> {
        let root = &self.config.discovery.root;
        if root.is_absolute() {
            return Ok(root.clone());
        }
        let cwd = std::env::current_dir().context("cannot resolve working directory")?;
        Ok(cwd.join(root))
    }
}
