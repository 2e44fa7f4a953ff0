//! Reconciliation engine
//!
//! Merges discovered and declared records into the canonical instance
//! list. Discovery is the existence signal; a declared record only
//! overrides the properties of an instance that was actually found on the
//! host. Ignored instances contribute nothing.

use crate::ignore::IgnoreList;
use crate::record::InstanceRecord;
use crate::report::{Diagnostic, RunReport};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Produce the canonical list. Guarantees on the result:
/// - `instance.uri` values are unique,
/// - every uri comes from `discovered`,
/// - no uri is on the ignore list.
///
/// When several declared records share one uri, the last one in iteration
/// order wins: the override index is built front-to-back and each
/// collision overwrites the previous entry.
pub fn reconcile(
    discovered: Vec<InstanceRecord>,
    declared: &[InstanceRecord],
    ignore: &IgnoreList,
    report: &mut RunReport,
) -> Vec<InstanceRecord> {
    let discovered_uris: HashSet<&str> = discovered.iter().filter_map(InstanceRecord::uri).collect();

    let mut overrides: HashMap<&str, &InstanceRecord> = HashMap::new();
    for record in declared {
        let Some(uri) = record.uri() else { continue };
        if !discovered_uris.contains(uri) {
            report.record(Diagnostic::DeclaredUnmatched { uri: uri.to_string() });
            continue;
        }
        overrides.insert(uri, record);
    }

    let mut canonical = Vec::with_capacity(discovered.len());
    for record in discovered {
        let Some(uri) = record.uri() else {
            debug!("dropping discovered record without instance.uri");
            continue;
        };
        let candidate = match overrides.get(uri) {
            Some(declared_record) => {
                report.overrides_applied += 1;
                (*declared_record).clone()
            }
            None => record,
        };
        // candidate always has a uri here: either the discovered one or a
        // declared record that was indexed by its uri
        if let Some(uri) = candidate.uri() {
            if ignore.is_ignored(uri) {
                report.record(Diagnostic::Ignored { uri: uri.to_string() });
                continue;
            }
        }
        canonical.push(candidate);
    }

    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        KEY_APP_KEY, KEY_APP_TYPE, KEY_INSTANCE_KEY, KEY_INSTANCE_URI, KEY_PLATFORM, PLATFORM_JAVA,
        TYPE_WEB,
    };

    fn discovered(uri: &str, app: &str) -> InstanceRecord {
        let mut record = InstanceRecord::new();
        record.set(KEY_PLATFORM, PLATFORM_JAVA);
        record.set(KEY_APP_TYPE, TYPE_WEB);
        record.set(KEY_APP_KEY, app);
        record.set(KEY_INSTANCE_KEY, app);
        record.set(KEY_INSTANCE_URI, uri);
        record
    }

    fn declared_override(uri: &str, app: &str) -> InstanceRecord {
        let mut record = discovered(uri, app);
        record.set(KEY_APP_KEY, app);
        record
    }

    /// The reference behavior: a full nested scan of `declared` for every
    /// discovered record, each match unconditionally overwriting the
    /// candidate. The indexed implementation must stay observably equal.
    fn reconcile_reference(
        discovered: &[InstanceRecord],
        declared: &[InstanceRecord],
        ignore: &IgnoreList,
    ) -> Vec<InstanceRecord> {
        let mut canonical = Vec::new();
        for d in discovered {
            let mut candidate = d.clone();
            for g in declared {
                if g.uri() == d.uri() {
                    candidate = g.clone();
                }
            }
            if let Some(uri) = candidate.uri() {
                if !ignore.is_ignored(uri) {
                    canonical.push(candidate);
                }
            }
        }
        canonical
    }

    #[test]
    fn test_declared_override_wins() {
        let found = vec![discovered("/opt/apps/webapps/shop", "shop")];
        let declared = vec![declared_override("/opt/apps/webapps/shop", "shop-storefront")];
        let mut report = RunReport::new();

        let canonical = reconcile(found, &declared, &IgnoreList::default(), &mut report);

        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].application_key(), Some("shop-storefront"));
        assert_eq!(report.overrides_applied, 1);
    }

    #[test]
    fn test_last_declared_record_wins_on_shared_uri() {
        let found = vec![discovered("/opt/apps/webapps/shop", "shop")];
        let declared = vec![
            declared_override("/opt/apps/webapps/shop", "first"),
            declared_override("/opt/apps/webapps/shop", "second"),
        ];
        let mut report = RunReport::new();

        let canonical = reconcile(found.clone(), &declared, &IgnoreList::default(), &mut report);
        let reference = reconcile_reference(&found, &declared, &IgnoreList::default());

        assert_eq!(canonical[0].application_key(), Some("second"));
        assert_eq!(canonical, reference);
    }

    #[test]
    fn test_indexed_merge_matches_reference_scan() {
        let found = vec![
            discovered("/opt/apps/webapps/a", "a"),
            discovered("/opt/apps/services/b", "b"),
            discovered("/opt/apps/batch/c", "c"),
        ];
        let declared = vec![
            declared_override("/opt/apps/services/b", "b-renamed"),
            declared_override("/opt/apps/webapps/a", "a-1"),
            declared_override("/opt/apps/webapps/a", "a-2"),
        ];
        let ignore = IgnoreList::from_lines("/opt/apps/batch/c\n");
        let mut report = RunReport::new();

        let canonical = reconcile(found.clone(), &declared, &ignore, &mut report);
        let reference = reconcile_reference(&found, &declared, &ignore);

        assert_eq!(canonical, reference);
        assert_eq!(canonical.len(), 2);
        assert_eq!(canonical[0].application_key(), Some("a-2"));
    }

    #[test]
    fn test_declared_only_records_are_dropped() {
        let found = vec![discovered("/opt/apps/webapps/a", "a")];
        let declared = vec![declared_override("/opt/apps/webapps/ghost", "ghost")];
        let mut report = RunReport::new();

        let canonical = reconcile(found, &declared, &IgnoreList::default(), &mut report);

        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].application_key(), Some("a"));
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::DeclaredUnmatched { uri } if uri == "/opt/apps/webapps/ghost")));
    }

    #[test]
    fn test_ignored_instances_are_excluded_entirely() {
        let found = vec![
            discovered("/opt/apps/webapps/a", "a"),
            discovered("/opt/apps/webapps/b", "b"),
        ];
        let ignore = IgnoreList::from_lines("/opt/apps/webapps/a\n");
        let mut report = RunReport::new();

        let canonical = reconcile(found, &[], &ignore, &mut report);

        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical[0].uri(), Some("/opt/apps/webapps/b"));
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn test_canonical_never_exceeds_discovered() {
        let found = vec![discovered("/opt/apps/webapps/a", "a")];
        let declared = vec![
            declared_override("/opt/apps/webapps/a", "a"),
            declared_override("/opt/apps/webapps/x", "x"),
            declared_override("/opt/apps/webapps/y", "y"),
        ];
        let mut report = RunReport::new();

        let canonical = reconcile(found, &declared, &IgnoreList::default(), &mut report);

        assert_eq!(canonical.len(), 1);
    }

    #[test]
    fn test_ignore_applies_to_overridden_candidate_uri() {
        // The declared record keeps the same uri; ignoring that uri must
        // remove the instance even though an override matched.
        let found = vec![discovered("/opt/apps/webapps/a", "a")];
        let declared = vec![declared_override("/opt/apps/webapps/a", "renamed")];
        let ignore = IgnoreList::from_lines("/opt/apps/webapps/a\n");
        let mut report = RunReport::new();

        let canonical = reconcile(found, &declared, &ignore, &mut report);

        assert!(canonical.is_empty());
        assert_eq!(report.ignored, 1);
    }
}
