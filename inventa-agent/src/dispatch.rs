//! Dispatch orchestrator
//!
//! Routing is an explicit table from (platform, type) to an ordered list
//! of step descriptors, so new combinations are added by extending data,
//! not by growing a branching chain. A producer or publish failure is
//! isolated to its step or payload; the rest of the sequence and the
//! rest of the run always continue.

use crate::producers::{ProducerKind, ProducerSet, SnapshotPayload};
use crate::publish::{PublishConfig, Publisher};
use crate::record::{
    InstanceRecord, KEY_APP_KEY, KEY_CLIENT_VERSION, KEY_INSTANCE_KEY, KEY_INSTANCE_URI,
    PLATFORM_JAVA, TYPE_BATCH, TYPE_SERVICE, TYPE_WEB,
};
use crate::report::{Diagnostic, RunReport};
use chrono::Utc;
use tracing::{debug, info};

/// How many payloads a step's producer yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one payload, published directly.
    Single,
    /// Zero or more payloads, each published independently.
    Many,
}

/// One producer invocation within a type's dispatch sequence.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub producer: ProducerKind,
    pub cardinality: Cardinality,
}

const fn single(producer: ProducerKind) -> Step {
    Step {
        producer,
        cardinality: Cardinality::Single,
    }
}

const fn many(producer: ProducerKind) -> Step {
    Step {
        producer,
        cardinality: Cardinality::Many,
    }
}

const WEB_STEPS: &[Step] = &[
    many(ProducerKind::ContainerContext),
    single(ProducerKind::ServiceRunParams),
    single(ProducerKind::HostServiceDescriptor),
    many(ProducerKind::CodeArchive),
    many(ProducerKind::PropertyFile),
    many(ProducerKind::SecurePropertyFile),
    many(ProducerKind::CodePropertyFile),
    single(ProducerKind::RunParamsFile),
    many(ProducerKind::CertificateFile),
];

const SERVICE_STEPS: &[Step] = &[
    single(ProducerKind::ServiceRunParams),
    single(ProducerKind::HostServiceDescriptor),
    many(ProducerKind::CodeArchive),
    many(ProducerKind::PropertyFile),
    many(ProducerKind::SecurePropertyFile),
    single(ProducerKind::RunParamsFile),
    many(ProducerKind::CodePropertyFile),
];

const BATCH_STEPS: &[Step] = &[
    many(ProducerKind::PropertyFile),
    many(ProducerKind::SecurePropertyFile),
    single(ProducerKind::RunParamsFile),
];

/// The dispatch table. A pair absent from the table dispatches nothing
/// and raises no error.
pub fn dispatch_steps(platform: &str, app_type: &str) -> Option<&'static [Step]> {
    match (platform, app_type) {
        (PLATFORM_JAVA, TYPE_WEB) => Some(WEB_STEPS),
        (PLATFORM_JAVA, TYPE_SERVICE) => Some(SERVICE_STEPS),
        (PLATFORM_JAVA, TYPE_BATCH) => Some(BATCH_STEPS),
        _ => None,
    }
}

/// Runs one canonical instance through its step sequence.
pub struct Dispatcher {
    producers: ProducerSet,
    publisher: Box<dyn Publisher>,
    publish_config: PublishConfig,
    hostname: String,
}

impl Dispatcher {
    pub fn new(producers: ProducerSet, publisher: Box<dyn Publisher>, publish_config: PublishConfig) -> Self {
        Self {
            producers,
            publisher,
            publish_config,
            hostname: gethostname::gethostname().to_string_lossy().to_string(),
        }
    }

    /// Dispatch one canonical instance. Never fails: producer and publish
    /// errors become diagnostics on the report.
    pub async fn dispatch(&self, record: &InstanceRecord, report: &mut RunReport) {
        let uri = record.uri().unwrap_or_default().to_string();
        let platform = record.platform().unwrap_or_default();
        let app_type = record.app_type().unwrap_or_default();

        let Some(steps) = dispatch_steps(platform, app_type) else {
            report.record(Diagnostic::UnknownDispatchKey {
                platform: platform.to_string(),
                app_type: app_type.to_string(),
            });
            return;
        };

        info!("dispatching {} ({}/{}, {} steps)", uri, platform, app_type, steps.len());
        report.dispatched += 1;

        for step in steps {
            let Some(producer) = self.producers.get(step.producer) else {
                report.record(Diagnostic::ProducerFailed {
                    uri: uri.clone(),
                    producer: step.producer.to_string(),
                    error: "producer not registered".to_string(),
                });
                continue;
            };

            let mut payloads = match producer.produce(record).await {
                Ok(payloads) => payloads,
                Err(e) => {
                    report.record(Diagnostic::ProducerFailed {
                        uri: uri.clone(),
                        producer: step.producer.to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if step.cardinality == Cardinality::Single && payloads.len() != 1 {
                report.record(Diagnostic::CardinalityMismatch {
                    uri: uri.clone(),
                    producer: step.producer.to_string(),
                    produced: payloads.len(),
                });
            }
            report.payloads_produced += payloads.len();

            for payload in &mut payloads {
                self.stamp(payload, record);
                match self.publisher.publish(payload, &self.publish_config).await {
                    Ok(()) => {
                        report.payloads_published += 1;
                        debug!("published {} for {}", payload.name, uri);
                    }
                    Err(e) => {
                        report.record(Diagnostic::PublishFailed {
                            uri: uri.clone(),
                            payload: payload.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Common metadata stamped on every payload before it ships.
    fn stamp(&self, payload: &mut SnapshotPayload, record: &InstanceRecord) {
        let metadata = &mut payload.metadata;
        for key in [KEY_INSTANCE_URI, KEY_INSTANCE_KEY, KEY_APP_KEY, KEY_CLIENT_VERSION] {
            if let Some(value) = record.get(key) {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
        metadata.insert("host".to_string(), self.hostname.clone());
        metadata.insert("captured.at".to_string(), Utc::now().to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows_have_documented_lengths() {
        assert_eq!(dispatch_steps("java", "web").unwrap().len(), 9);
        assert_eq!(dispatch_steps("java", "service").unwrap().len(), 7);
        assert_eq!(dispatch_steps("java", "batch").unwrap().len(), 3);
    }

    #[test]
    fn test_web_sequence_order() {
        let steps = dispatch_steps("java", "web").unwrap();
        assert_eq!(steps[0].producer, ProducerKind::ContainerContext);
        assert_eq!(steps[0].cardinality, Cardinality::Many);
        assert_eq!(steps[1].producer, ProducerKind::ServiceRunParams);
        assert_eq!(steps[1].cardinality, Cardinality::Single);
        assert_eq!(steps[8].producer, ProducerKind::CertificateFile);
    }

    #[test]
    fn test_service_sequence_ends_with_code_properties() {
        let steps = dispatch_steps("java", "service").unwrap();
        assert_eq!(steps[0].producer, ProducerKind::ServiceRunParams);
        assert_eq!(steps[5].producer, ProducerKind::RunParamsFile);
        assert_eq!(steps[6].producer, ProducerKind::CodePropertyFile);
    }

    #[test]
    fn test_unknown_pairs_have_no_sequence() {
        assert!(dispatch_steps("java", "cron").is_none());
        assert!(dispatch_steps("dotnet", "web").is_none());
        assert!(dispatch_steps("", "").is_none());
    }
}
