//! Per-run diagnostics and the run report
//!
//! Defects and noteworthy events are collected as typed events instead of
//! loose log lines, so tests can assert on them and callers can ship the
//! report wherever they like. Logging still happens at the point where an
//! event is recorded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// A noteworthy event observed during a single run. None of these abort
/// the run; the engine completes best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A set-once record key was assigned twice (invariant violation).
    DuplicateKey { uri: String, key: String },
    /// A declared file could not be loaded as an instance record.
    DeclaredInvalid { file: String, reason: String },
    /// A declared record matched no discovered instance and was dropped.
    DeclaredUnmatched { uri: String },
    /// An instance was excluded by the ignore list.
    Ignored { uri: String },
    /// No dispatch sequence exists for this (platform, type) pair.
    UnknownDispatchKey { platform: String, app_type: String },
    /// A single-payload producer yielded a different payload count.
    CardinalityMismatch {
        uri: String,
        producer: String,
        produced: usize,
    },
    /// A producer failed; the remaining steps of the instance still ran.
    ProducerFailed {
        uri: String,
        producer: String,
        error: String,
    },
    /// A publish failed; the remaining payloads still shipped.
    PublishFailed {
        uri: String,
        payload: String,
        error: String,
    },
}

/// Outcome of one full inventory run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub discovered: usize,
    pub declared_loaded: usize,
    pub overrides_applied: usize,
    pub ignored: usize,
    pub canonical: usize,
    pub dispatched: usize,
    pub skipped_unknown_type: usize,
    pub payloads_produced: usize,
    pub payloads_published: usize,
    pub producer_failures: usize,
    pub publish_failures: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            discovered: 0,
            declared_loaded: 0,
            overrides_applied: 0,
            ignored: 0,
            canonical: 0,
            dispatched: 0,
            skipped_unknown_type: 0,
            payloads_produced: 0,
            payloads_published: 0,
            producer_failures: 0,
            publish_failures: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic, bump the matching counter and log it.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Ignored { .. } => self.ignored += 1,
            Diagnostic::UnknownDispatchKey { .. } => self.skipped_unknown_type += 1,
            Diagnostic::ProducerFailed { .. } => self.producer_failures += 1,
            Diagnostic::PublishFailed { .. } => self.publish_failures += 1,
            _ => {}
        }
        warn!("run diagnostic: {:?}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn has_failures(&self) -> bool {
        self.producer_failures > 0 || self.publish_failures > 0
    }

    /// One-line summary for the end-of-run log.
    pub fn summary(&self) -> String {
        format!(
            "run complete: {} discovered, {} declared, {} overridden, {} ignored, \
             {} dispatched, {} payloads published ({} produce failures, {} publish failures)",
            self.discovered,
            self.declared_loaded,
            self.overrides_applied,
            self.ignored,
            self.dispatched,
            self.payloads_published,
            self.producer_failures,
            self.publish_failures,
        )
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
