//! Diff engine - desired vs. actual comparison
//!
//! Compares a partial desired [`Instance`] against the full actual one,
//! producing a satisfied verdict and the set of changed properties. Backs
//! both test (the verdict becomes `_inDesiredState`) and set (no mutation
//! when already satisfied).

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::instance::{EXIST_PROPERTY, Instance};
use crate::schema::{Equality, Schema};

/// Outcome of comparing desired against actual state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Whether the unit already satisfies the desired state
    pub satisfied: bool,
    /// Names of the properties that differ (`_exist` when existence does)
    pub changed: BTreeSet<String>,
}

impl Diff {
    fn satisfied() -> Self {
        Self {
            satisfied: true,
            changed: BTreeSet::new(),
        }
    }

    fn existence() -> Self {
        let mut changed = BTreeSet::new();
        changed.insert(EXIST_PROPERTY.to_string());
        Self {
            satisfied: false,
            changed,
        }
    }

    /// Whether a specific property was recorded as changed
    pub fn changed_contains(&self, name: &str) -> bool {
        self.changed.contains(name)
    }
}

/// Compare a desired instance against the actual one under a schema
///
/// Only properties present in the desired instance are compared; each uses
/// its declared equality. Set-valued properties honor additive vs. purge
/// membership semantics via the desired `_purge` flag.
pub fn diff(schema: &Schema, desired: &Instance, actual: &Instance) -> Diff {
    // Existence gates everything else.
    if !desired.exists() {
        return if actual.exists() {
            Diff::existence()
        } else {
            Diff::satisfied()
        };
    }
    if !actual.exists() {
        return Diff::existence();
    }

    let mut changed = BTreeSet::new();
    for (name, want) in &desired.properties {
        let Some(spec) = schema.find(name) else {
            continue;
        };
        // Get never returns write-only values, so there is nothing to
        // compare them against.
        if spec.write_only {
            continue;
        }
        let have = actual.property(name);
        let equal = match spec.equality {
            Equality::Set => set_satisfied(want, have, desired.purges()),
            Equality::Ordered => have == Some(want),
            Equality::CaseInsensitive => scalar_equal_ci(want, have),
            Equality::CaseSensitive => have == Some(want),
        };
        if !equal {
            changed.insert(name.clone());
        }
    }

    Diff {
        satisfied: changed.is_empty(),
        changed,
    }
}

/// Membership check for set-valued properties
///
/// Additive (purge=false): actual must be a superset of desired.
/// Purge: the two must contain exactly the same members.
fn set_satisfied(want: &Value, have: Option<&Value>, purge: bool) -> bool {
    let Some(want_items) = want.as_array() else {
        return have == Some(want);
    };
    let have_items = match have.and_then(Value::as_array) {
        Some(items) => items,
        None => return want_items.is_empty() && !purge,
    };

    let superset = want_items.iter().all(|w| have_items.contains(w));
    if purge {
        superset && have_items.iter().all(|h| want_items.contains(h))
    } else {
        superset
    }
}

fn scalar_equal_ci(want: &Value, have: Option<&Value>) -> bool {
    match (want, have) {
        (Value::String(w), Some(Value::String(h))) => w.eq_ignore_ascii_case(h),
        _ => have == Some(want),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyKind, PropertySpec, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder("Verge/Sample", "0.1.0")
            .property(
                PropertySpec::new("name", PropertyKind::String)
                    .key()
                    .equality(Equality::CaseInsensitive),
            )
            .property(
                PropertySpec::new("members", PropertyKind::StringList).equality(Equality::Set),
            )
            .property(
                PropertySpec::new("steps", PropertyKind::StringList).equality(Equality::Ordered),
            )
            .property(PropertySpec::new("value", PropertyKind::String))
            .property(PropertySpec::new("secret", PropertyKind::String).write_only())
            .build()
    }

    fn desired(payload: serde_json::Value) -> Instance {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn existence_gate_short_circuits() {
        // Both absent: satisfied no matter what else the payload says.
        let d = desired(json!({"name": "x", "value": "anything", "_exist": false}));
        let a = desired(json!({"name": "x", "_exist": false}));
        let result = diff(&schema(), &d, &a);
        assert!(result.satisfied);
        assert!(result.changed.is_empty());
    }

    #[test]
    fn unwanted_unit_still_present() {
        let d = desired(json!({"name": "x", "_exist": false}));
        let a = desired(json!({"name": "x", "value": "v"}));
        let result = diff(&schema(), &d, &a);
        assert!(!result.satisfied);
        assert_eq!(result.changed.len(), 1);
        assert!(result.changed_contains(EXIST_PROPERTY));
    }

    #[test]
    fn missing_unit_reports_only_existence() {
        let d = desired(json!({"name": "x", "value": "v", "members": ["a"]}));
        let a = Instance::absent(&schema(), &d);
        let result = diff(&schema(), &d, &a);
        assert!(!result.satisfied);
        assert_eq!(result.changed.len(), 1);
        assert!(result.changed_contains(EXIST_PROPERTY));
    }

    #[test]
    fn case_insensitive_name_matches() {
        let d = desired(json!({"name": "WebAdmins", "value": "v"}));
        let a = desired(json!({"name": "webadmins", "value": "v"}));
        assert!(diff(&schema(), &d, &a).satisfied);
    }

    #[test]
    fn case_sensitive_value_differs() {
        let d = desired(json!({"name": "x", "value": "V"}));
        let a = desired(json!({"name": "x", "value": "v"}));
        let result = diff(&schema(), &d, &a);
        assert!(!result.satisfied);
        assert!(result.changed_contains("value"));
    }

    #[test]
    fn additive_superset_is_satisfied() {
        let d = desired(json!({"name": "x", "members": ["a", "b"]}));
        let a = desired(json!({"name": "x", "members": ["b", "c", "a"]}));
        assert!(diff(&schema(), &d, &a).satisfied);
    }

    #[test]
    fn additive_missing_member_not_satisfied() {
        let d = desired(json!({"name": "x", "members": ["a", "d"]}));
        let a = desired(json!({"name": "x", "members": ["a", "b", "c"]}));
        let result = diff(&schema(), &d, &a);
        assert!(!result.satisfied);
        assert!(result.changed_contains("members"));
    }

    #[test]
    fn purge_requires_exact_membership() {
        let d = desired(json!({"name": "x", "members": ["b"], "_purge": true}));
        let a = desired(json!({"name": "x", "members": ["a", "b"]}));
        let result = diff(&schema(), &d, &a);
        assert!(!result.satisfied);
        assert!(result.changed_contains("members"));

        let exact = desired(json!({"name": "x", "members": ["b"]}));
        assert!(diff(&schema(), &d, &exact).satisfied);
    }

    #[test]
    fn purge_ignores_order() {
        let d = desired(json!({"name": "x", "members": ["b", "a"], "_purge": true}));
        let a = desired(json!({"name": "x", "members": ["a", "b"]}));
        assert!(diff(&schema(), &d, &a).satisfied);
    }

    #[test]
    fn ordered_list_compares_sequence() {
        let d = desired(json!({"name": "x", "steps": ["one", "two"]}));
        let same = desired(json!({"name": "x", "steps": ["one", "two"]}));
        let reordered = desired(json!({"name": "x", "steps": ["two", "one"]}));
        assert!(diff(&schema(), &d, &same).satisfied);
        assert!(!diff(&schema(), &d, &reordered).satisfied);
    }

    #[test]
    fn properties_absent_from_desired_are_ignored() {
        let d = desired(json!({"name": "x"}));
        let a = desired(json!({"name": "x", "value": "whatever", "members": ["z"]}));
        assert!(diff(&schema(), &d, &a).satisfied);
    }

    #[test]
    fn write_only_properties_are_skipped() {
        let d = desired(json!({"name": "x", "secret": "hunter2"}));
        let a = desired(json!({"name": "x"}));
        assert!(diff(&schema(), &d, &a).satisfied);
    }
}
