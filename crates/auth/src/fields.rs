//! Field-level response filtering.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::roles::RoleDefinition;

/// Per-resource hidden fields for one principal.
///
/// A field is hidden only when **every** role of the principal hides it, so
/// adding a role never takes visibility away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldPolicy {
    hidden: BTreeMap<String, BTreeSet<String>>,
}

impl FieldPolicy {
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a RoleDefinition>) -> Self {
        let mut hidden: Option<BTreeMap<String, BTreeSet<String>>> = None;
        for role in roles {
            hidden = Some(match hidden {
                None => role.hidden_fields.clone(),
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(resource, fields)| {
                        let other = role.hidden_fields.get(&resource)?;
                        let both: BTreeSet<String> = fields.intersection(other).cloned().collect();
                        (!both.is_empty()).then_some((resource, both))
                    })
                    .collect(),
            });
        }
        Self {
            hidden: hidden.unwrap_or_default(),
        }
    }

    /// Every `(resource, fields)` pair hidden from this principal.
    pub fn hidden(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.hidden.iter().map(|(r, f)| (r.as_str(), f))
    }

    pub fn hidden_for(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.hidden.get(resource)
    }

    /// Remove hidden keys from `value`, descending into nested objects and arrays.
    pub fn redact(&self, resource: &str, value: &mut Value) {
        if let Some(fields) = self.hidden.get(resource) {
            strip(value, fields);
        }
    }
}

fn strip(value: &mut Value, fields: &BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !fields.contains(k));
            for v in map.values_mut() {
                strip(v, fields);
            }
        }
        Value::Array(items) => {
            for v in items {
                strip(v, fields);
            }
        }
        _ => {}
    }
}
