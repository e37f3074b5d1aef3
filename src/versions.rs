//! Version registry construction.
//!
//! A registry maps a compound key path (`;`-separated) to the version counter
//! observed at the previous render. The change detector consults it to catch
//! in-place mutations of versionable values whose identity never changed.

use crate::classify::{is_versionable, is_versionable_array, is_ws4_content_option};
use crate::value::{Internals, InternalsMap, ObjectValue, Value};
use std::collections::HashMap;

pub type VersionRegistry = HashMap<String, u64>;

/// Walks an options container and records every reachable version counter.
/// Absent containers yield an empty registry.
pub fn collect_object_versions(options: Option<&ObjectValue>) -> VersionRegistry {
    let mut registry = VersionRegistry::new();
    if let Some(object) = options {
        collect_object_into(object, "", &mut registry);
    }
    registry
}

/// Same walk over an internals collection.
pub fn collect_internals_versions(internals: &InternalsMap) -> VersionRegistry {
    let mut registry = VersionRegistry::new();
    collect_internals_into(internals, "", &mut registry);
    registry
}

fn collect_object_into(object: &ObjectValue, prefix: &str, registry: &mut VersionRegistry) {
    for key in object.keys() {
        if let Some(value) = object.get(&key) {
            collect_value(value, prefix, &format!("{prefix}{key}"), registry);
        }
    }
}

fn collect_internals_into(internals: &InternalsMap, prefix: &str, registry: &mut VersionRegistry) {
    for (key, value) in &internals.entries {
        collect_value(value, prefix, &format!("{prefix}{key}"), registry);
    }
}

fn collect_value(value: &Value, prefix: &str, key_path: &str, registry: &mut VersionRegistry) {
    if is_versionable(value) {
        if let Value::Versioned(v) = value {
            registry.insert(key_path.to_string(), v.version());
        }
        return;
    }
    if is_versionable_array(value) {
        if let Value::VersionedArray(a) = value {
            registry.insert(key_path.to_string(), a.array_version());
        }
        return;
    }
    // WS3 closures are deliberately not walked: their internals are only
    // compared, never version-registered. Long-standing behavior old templates
    // rely on.
    if is_ws4_content_option(value) {
        if let Value::Content(content) = value {
            if let Internals::Map(map) = &content.internal {
                collect_internals_into(map, &format!("{key_path};"), registry);
            }
        }
        return;
    }
    if let Value::Object(object) = value {
        // Scope objects flatten: their fields register under the parent
        // prefix, without the scope key itself appearing in the path.
        if object.flags.scope_object {
            collect_object_into(object, prefix, registry);
        }
    }
}
