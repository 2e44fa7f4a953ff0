//! Instance records exchanged between discovery, reconciliation and dispatch
//!
//! A record is a flat string-to-string property map. Scanners and the
//! declared-inventory loader both produce the same shape; `instance.uri`
//! (the absolute installation path) is the identity key throughout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Runtime platform family of the application.
pub const KEY_PLATFORM: &str = "application.platform";
/// Functional category of the application (web, service, batch).
pub const KEY_APP_TYPE: &str = "application.type";
/// Logical application name, derived from the installation directory.
pub const KEY_APP_KEY: &str = "application.key";
/// Absolute filesystem path of the instance. Identity key for
/// reconciliation and ignore matching.
pub const KEY_INSTANCE_URI: &str = "instance.uri";
/// Instance-local identifier, defaults to the directory leaf name.
pub const KEY_INSTANCE_KEY: &str = "instance.key";
/// Version of the snapshot client, annotated once before dispatch.
pub const KEY_CLIENT_VERSION: &str = "snapshot.client.version";

/// The one platform tag currently populated in the dispatch table.
pub const PLATFORM_JAVA: &str = "java";
/// Web-hosted applications (servlet containers and similar).
pub const TYPE_WEB: &str = "web";
/// Long-running background services.
pub const TYPE_SERVICE: &str = "service";
/// Scheduled batch jobs.
pub const TYPE_BATCH: &str = "batch";

/// One discovered or declared application installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceRecord {
    properties: HashMap<String, String>,
}

impl InstanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-parsed property map (declared inventory path).
    pub fn from_properties(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Set or overwrite a property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Set a property only if it is not already present. Returns `false`
    /// and keeps the existing value when the key was already set; callers
    /// surface that as an invariant-violation diagnostic.
    pub fn init(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.properties.contains_key(key) {
            return false;
        }
        self.properties.insert(key.to_string(), value.into());
        true
    }

    pub fn uri(&self) -> Option<&str> {
        self.get(KEY_INSTANCE_URI)
    }

    pub fn instance_key(&self) -> Option<&str> {
        self.get(KEY_INSTANCE_KEY)
    }

    pub fn application_key(&self) -> Option<&str> {
        self.get(KEY_APP_KEY)
    }

    pub fn platform(&self) -> Option<&str> {
        self.get(KEY_PLATFORM)
    }

    pub fn app_type(&self) -> Option<&str> {
        self.get(KEY_APP_TYPE)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut record = InstanceRecord::new();
        record.set(KEY_APP_KEY, "app1");
        assert_eq!(record.application_key(), Some("app1"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_init_is_set_once() {
        let mut record = InstanceRecord::new();
        assert!(record.init(KEY_INSTANCE_KEY, "app1"));
        assert!(!record.init(KEY_INSTANCE_KEY, "app2"));
        // First value wins on a rejected re-assignment
        assert_eq!(record.instance_key(), Some("app1"));
    }

    #[test]
    fn test_from_properties_preserves_shape() {
        let mut map = HashMap::new();
        map.insert(KEY_INSTANCE_URI.to_string(), "/opt/apps/webapps/a".to_string());
        map.insert(KEY_APP_KEY.to_string(), "a".to_string());
        let record = InstanceRecord::from_properties(map);
        assert_eq!(record.uri(), Some("/opt/apps/webapps/a"));
        assert_eq!(record.len(), 2);
    }
}
