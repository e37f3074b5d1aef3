//! The change detector.
//!
//! Given a next and a prev container plus a version registry snapshot, decides
//! whether a component must re-render. The bias is asymmetric by contract:
//! whenever equality cannot be proven, the answer is "changed". A spurious
//! redraw costs performance; a missed redraw is a correctness bug.

use crate::classify::{
    is_children_as_content, is_scope_object, is_ws4_content_option, should_check_deep,
    should_check_versions, should_ignore_changing, values_identical,
};
use crate::value::{Internals, InternalsMap, ObjectValue, Value};
use crate::versions::{collect_object_versions, VersionRegistry};
use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// FRAMEWORK KEY TABLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Synthetic dirty-checking bindings carry this name prefix. They are
/// generator bookkeeping, not user options.
pub const DIRTY_CHECKING_PREFIX: &str = "__dirtyCheckingVars_";

/// Validator lists are rebuilt as fresh closures on every render, so their
/// identity never matches. Compared always-changed by name.
const VALIDATORS_OPTION: &str = "validators";

lazy_static! {
    /// Framework-internal properties that ride along on options containers and
    /// must never drive a re-render decision.
    static ref SKIPPED_OPTION_NAMES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("_logicParent");
        s.insert("_$createdFromCode");
        s.insert("_$events");
        s
    };

    /// Block-option names apply only to the call's own top-level keys; nested
    /// recursion always runs with an empty set.
    static ref NO_BLOCK_NAMES: HashSet<String> = HashSet::new();
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTION CONTEXT & RESULT
// ═══════════════════════════════════════════════════════════════════════════════

pub struct DetectCtx<'a> {
    /// Version counters captured at the previous render.
    pub versions: &'a VersionRegistry,
    /// Top-level option names opted into structural comparison.
    pub block_names: &'a HashSet<String>,
    /// Compound-control compatibility: skip dirty-checking keys entirely.
    pub ignore_dirty_checking: bool,
    /// Compound-control compatibility: suppress insertion-triggered changes.
    pub is_compound: bool,
    /// Short-circuit on the first changed key instead of building the map.
    pub optimize: bool,
}

impl<'a> DetectCtx<'a> {
    /// Context for recursive descents: block names do not propagate (the
    /// opt-in is per top-level key), and only a boolean verdict is needed.
    fn for_nested(&self) -> DetectCtx<'a> {
        DetectCtx {
            versions: self.versions,
            block_names: &NO_BLOCK_NAMES,
            ignore_dirty_checking: self.ignore_dirty_checking,
            is_compound: self.is_compound,
            optimize: true,
        }
    }
}

#[derive(Debug)]
pub enum Detection {
    Unchanged,
    /// Short-circuit verdict from an `optimize` run.
    Changed,
    /// Changed keys with their next-side values, verbatim.
    Map(HashMap<String, Value>),
}

impl Detection {
    pub fn is_changed(&self) -> bool {
        match self {
            Detection::Unchanged => false,
            Detection::Changed => true,
            Detection::Map(map) => !map.is_empty(),
        }
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        match self {
            Detection::Map(map) => map,
            _ => HashMap::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER WALKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Diffs two options containers. Keys are enumerated from both sides including
/// inherited properties; `prefix` extends version-registry key paths on
/// recursive descents.
pub fn detect_options(
    next: &ObjectValue,
    prev: &ObjectValue,
    ctx: &DetectCtx,
    prefix: &str,
) -> Detection {
    let mut keys = next.keys();
    keys.extend(prev.keys());

    let mut changes: HashMap<String, Value> = HashMap::new();
    for key in keys {
        if SKIPPED_OPTION_NAMES.contains(key.as_str()) {
            continue;
        }
        let is_dirty = key.starts_with(DIRTY_CHECKING_PREFIX);
        if is_dirty && ctx.ignore_dirty_checking {
            continue;
        }

        let has_next = next.has(&key);
        let has_prev = prev.has(&key);
        let next_value = next.get(&key).cloned().unwrap_or(Value::Undefined);
        let prev_value = prev.get(&key).cloned().unwrap_or(Value::Undefined);
        let is_block = prefix.is_empty() && ctx.block_names.contains(&key);

        let changed = if has_next && has_prev {
            value_changed(
                &key,
                &format!("{prefix}{key}"),
                &next_value,
                &prev_value,
                ctx,
                is_dirty,
                is_block,
            )
        } else if has_next {
            // Insertion. Compound controls manage option introduction through
            // explicit setters; dirty-checking keys still report.
            !(ctx.is_compound && !is_dirty)
        } else {
            // Removal.
            !should_ignore_changing(&next_value)
        };

        if changed {
            if ctx.optimize {
                return Detection::Changed;
            }
            changes.insert(key, next_value);
        }
    }

    if changes.is_empty() {
        Detection::Unchanged
    } else {
        Detection::Map(changes)
    }
}

/// Diffs two internals collections. Keys are small integers assigned by the
/// generator; dirty-checking and block options do not apply here.
pub fn detect_internals(
    next: &InternalsMap,
    prev: &InternalsMap,
    ctx: &DetectCtx,
    prefix: &str,
) -> Detection {
    let mut keys: BTreeSet<u32> = next.entries.keys().copied().collect();
    keys.extend(prev.entries.keys().copied());

    let mut changes: HashMap<String, Value> = HashMap::new();
    for key in keys {
        let has_next = next.entries.contains_key(&key);
        let has_prev = prev.entries.contains_key(&key);
        let next_value = next.entries.get(&key).cloned().unwrap_or(Value::Undefined);
        let prev_value = prev.entries.get(&key).cloned().unwrap_or(Value::Undefined);

        let changed = if has_next && has_prev {
            value_changed(
                &key.to_string(),
                &format!("{prefix}{key}"),
                &next_value,
                &prev_value,
                ctx,
                false,
                false,
            )
        } else if has_next {
            !ctx.is_compound
        } else {
            !should_ignore_changing(&next_value)
        };

        if changed {
            if ctx.optimize {
                return Detection::Changed;
            }
            changes.insert(key.to_string(), next_value);
        }
    }

    if changes.is_empty() {
        Detection::Unchanged
    } else {
        Detection::Map(changes)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-VALUE RULE LADDER
// ═══════════════════════════════════════════════════════════════════════════════

fn value_changed(
    key: &str,
    full_key: &str,
    next: &Value,
    prev: &Value,
    ctx: &DetectCtx,
    is_dirty: bool,
    is_block: bool,
) -> bool {
    if values_identical(next, prev) {
        // Same identity. Only a version counter (or the children-as-content
        // marker, which equality can never vouch for) may still signal change.
        if let Value::Versioned(v) = next {
            return ctx.versions.get(full_key).copied() != Some(v.version());
        }
        if let Value::VersionedArray(a) = next {
            // No snapshot recorded for this key means the array was not seen
            // by the previous registry pass; comparing against nothing would
            // misreport it. Skip the check entirely then.
            return match ctx.versions.get(full_key) {
                Some(&recorded) => recorded != a.array_version(),
                None => false,
            };
        }
        return is_children_as_content(next);
    }

    // Identities differ from here on.
    if should_ignore_changing(next) {
        return false;
    }
    if prev.is_falsy() {
        // Nothing to structurally compare against.
        return true;
    }
    if key == VALIDATORS_OPTION {
        return true;
    }

    if is_ws4_content_option(next) && is_ws4_content_option(prev) {
        // Outer wrapper identity is meaningless; the internals decide.
        if let (Value::Content(n), Value::Content(p)) = (next, prev) {
            return match (&n.internal, &p.internal) {
                (Internals::Map(next_map), Internals::Map(prev_map)) => {
                    let nested = ctx.for_nested();
                    detect_internals(next_map, prev_map, &nested, &format!("{full_key};"))
                        .is_changed()
                }
                // Legacy payload inside a content option: equality unprovable.
                _ => true,
            };
        }
        return true;
    }

    if let Value::Array(next_items) = next {
        if is_block {
            if let Value::Array(prev_items) = prev {
                return array_changed(&next_items.items, &prev_items.items, ctx, full_key);
            }
            return true;
        }
        // Plain arrays are reference-compared only.
        return true;
    }

    if should_check_versions(next) {
        if let (Value::Versioned(n), Value::Versioned(p)) = (next, prev) {
            return n.version() != p.version();
        }
    }

    if is_dirty && is_scope_object(next) && is_scope_object(prev) {
        if let (Value::Object(n), Value::Object(p)) = (next, prev) {
            // Scope objects live in the parent namespace: empty prefix.
            let nested = ctx.for_nested();
            return detect_options(n, p, &nested, "").is_changed();
        }
    }

    if (should_check_deep(next) && should_check_deep(prev)) || is_block {
        if let (Value::Object(n), Value::Object(p)) = (next, prev) {
            let fresh_versions = collect_object_versions(Some(n));
            let nested = DetectCtx {
                versions: &fresh_versions,
                block_names: &NO_BLOCK_NAMES,
                ignore_dirty_checking: true,
                is_compound: ctx.is_compound,
                optimize: true,
            };
            return detect_options(n, p, &nested, "").is_changed();
        }
        return true;
    }

    // Default: any identity inequality not claimed by a more specific rule.
    true
}

/// Element-wise comparison for block-option arrays and nested array values
/// inside them. Positional prefixes keep registry paths addressable.
fn array_changed(next: &[Value], prev: &[Value], ctx: &DetectCtx, prefix: &str) -> bool {
    if next.len() != prev.len() {
        return true;
    }
    for (index, (next_item, prev_item)) in next.iter().zip(prev).enumerate() {
        if values_identical(next_item, prev_item) {
            continue;
        }
        let elem_prefix = format!("{prefix};{index};");
        let changed = match (next_item, prev_item) {
            (Value::Object(n), Value::Object(p)) => {
                let nested = ctx.for_nested();
                detect_options(n, p, &nested, &elem_prefix).is_changed()
            }
            (Value::Array(n), Value::Array(p)) => {
                array_changed(&n.items, &p.items, ctx, &elem_prefix)
            }
            _ => true,
        };
        if changed {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ContentKind, ContentOption, ValueFlags, Versioned};
    use std::collections::{BTreeMap, HashMap};
    use std::rc::Rc;

    fn options(fields: Vec<(&str, Value)>) -> ObjectValue {
        ObjectValue {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            flags: ValueFlags::default(),
            proto: None,
        }
    }

    fn ctx<'a>(
        versions: &'a VersionRegistry,
        block_names: &'a HashSet<String>,
        optimize: bool,
    ) -> DetectCtx<'a> {
        DetectCtx {
            versions,
            block_names,
            ignore_dirty_checking: false,
            is_compound: false,
            optimize,
        }
    }

    fn detect(next: &ObjectValue, prev: &ObjectValue) -> Detection {
        let versions = VersionRegistry::new();
        let blocks = HashSet::new();
        detect_options(next, prev, &ctx(&versions, &blocks, false), "")
    }

    #[test]
    fn test_equal_primitives_unchanged() {
        let next = options(vec![("a", Value::Number(1.0)), ("b", Value::string("x"))]);
        let prev = options(vec![("a", Value::Number(1.0)), ("b", Value::string("x"))]);
        assert!(!detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_skipped_framework_keys() {
        let next = options(vec![("_logicParent", Value::Number(1.0))]);
        let prev = options(vec![("_logicParent", Value::Number(2.0))]);
        assert!(!detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_validators_always_changed_on_distinct_identity() {
        let next = options(vec![("validators", Value::func())]);
        let prev = options(vec![("validators", Value::func())]);
        let result = detect(&next, &prev);
        assert!(result.is_changed());
        assert!(result.into_map().contains_key("validators"));

        // Same closure identity stays unchanged.
        let f = Value::func();
        let next = options(vec![("validators", f.clone())]);
        let prev = options(vec![("validators", f)]);
        assert!(!detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_plain_arrays_reference_compared() {
        let shared = Value::array(vec![Value::Number(1.0)]);
        let next = options(vec![("items", shared.clone())]);
        let prev = options(vec![("items", shared)]);
        assert!(!detect(&next, &prev).is_changed());

        let next = options(vec![("items", Value::array(vec![Value::Number(1.0)]))]);
        let prev = options(vec![("items", Value::array(vec![Value::Number(1.0)]))]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_block_arrays_compare_structurally() {
        let element = |n: f64| {
            let mut fields = HashMap::new();
            fields.insert("v".to_string(), Value::Number(n));
            Value::object(fields)
        };
        let next = options(vec![("cols", Value::array(vec![element(1.0), element(2.0)]))]);
        let prev = options(vec![("cols", Value::array(vec![element(1.0), element(2.0)]))]);

        let versions = VersionRegistry::new();
        let blocks: HashSet<String> = ["cols".to_string()].into_iter().collect();
        assert!(!detect_options(&next, &prev, &ctx(&versions, &blocks, false), "").is_changed());

        // One element diverges.
        let next = options(vec![("cols", Value::array(vec![element(1.0), element(3.0)]))]);
        assert!(detect_options(&next, &prev, &ctx(&versions, &blocks, false), "").is_changed());

        // Length mismatch is changed outright.
        let next = options(vec![("cols", Value::array(vec![element(1.0)]))]);
        assert!(detect_options(&next, &prev, &ctx(&versions, &blocks, false), "").is_changed());
    }

    #[test]
    fn test_versioned_array_guard_requires_recorded_snapshot() {
        let array = Rc::new(crate::value::VersionedArray::new(vec![], 4));
        let next = options(vec![("rows", Value::VersionedArray(array.clone()))]);
        let prev = options(vec![("rows", Value::VersionedArray(array.clone()))]);

        // Registry never saw this key: no change reported.
        assert!(!detect(&next, &prev).is_changed());

        // Recorded snapshot differs: changed.
        let mut versions = VersionRegistry::new();
        versions.insert("rows".to_string(), 3);
        let blocks = HashSet::new();
        assert!(detect_options(&next, &prev, &ctx(&versions, &blocks, false), "").is_changed());

        // Recorded snapshot matches: unchanged.
        versions.insert("rows".to_string(), 4);
        assert!(!detect_options(&next, &prev, &ctx(&versions, &blocks, false), "").is_changed());
    }

    #[test]
    fn test_prefer_version_api_overrides_identity() {
        let next = options(vec![(
            "fmt",
            Value::Versioned(Rc::new(Versioned::with_prefer_version_api(5))),
        )]);
        let prev = options(vec![(
            "fmt",
            Value::Versioned(Rc::new(Versioned::with_prefer_version_api(5))),
        )]);
        assert!(!detect(&next, &prev).is_changed());

        let prev = options(vec![(
            "fmt",
            Value::Versioned(Rc::new(Versioned::with_prefer_version_api(4))),
        )]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_deep_checking_flag_compares_structurally() {
        let deep = |n: f64| {
            let mut fields = HashMap::new();
            fields.insert("v".to_string(), Value::Number(n));
            Value::Object(Rc::new(ObjectValue {
                fields,
                flags: ValueFlags {
                    deep_checking: true,
                    ..ValueFlags::default()
                },
                proto: None,
            }))
        };
        let next = options(vec![("cfg", deep(1.0))]);
        let prev = options(vec![("cfg", deep(1.0))]);
        assert!(!detect(&next, &prev).is_changed());

        let prev = options(vec![("cfg", deep(2.0))]);
        assert!(detect(&next, &prev).is_changed());

        // Flag on one side only: plain identity comparison, changed.
        let mut fields = HashMap::new();
        fields.insert("v".to_string(), Value::Number(1.0));
        let prev = options(vec![("cfg", Value::object(fields))]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_ignore_changing_suppresses_update_and_removal() {
        let ignored = Value::Object(Rc::new(ObjectValue {
            fields: HashMap::new(),
            flags: ValueFlags {
                ignore_changing: true,
                ..ValueFlags::default()
            },
            proto: None,
        }));
        let next = options(vec![("silent", ignored.clone())]);
        let prev = options(vec![("silent", Value::object(HashMap::new()))]);
        assert!(!detect(&next, &prev).is_changed());

        // Removal reports: the absent next value carries no suppression flag.
        let prev = options(vec![("silent", Value::Number(1.0)), ("other", ignored)]);
        let map = detect(&next, &prev).into_map();
        assert!(map.contains_key("other"));
        assert!(matches!(map.get("other"), Some(Value::Undefined)));
        // "silent" update suppressed: the flagged next value never changes.
        assert!(!map.contains_key("silent"));
    }

    #[test]
    fn test_content_option_internals_decide() {
        let content = |v: f64| {
            let mut entries = BTreeMap::new();
            entries.insert(0, Value::Number(v));
            Value::Content(Rc::new(ContentOption::new(
                ContentKind::VdomArray,
                Internals::Map(InternalsMap::new(entries)),
            )))
        };
        let next = options(vec![("slot", content(1.0))]);
        let prev = options(vec![("slot", content(1.0))]);
        assert!(!detect(&next, &prev).is_changed());

        let prev = options(vec![("slot", content(2.0))]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_ws3_content_option_identity_compared() {
        let content = || {
            Value::Content(Rc::new(ContentOption::new(
                ContentKind::Ws3Closure,
                Internals::Map(InternalsMap::default()),
            )))
        };
        let next = options(vec![("slot", content())]);
        let prev = options(vec![("slot", content())]);
        // Legacy closures never reach the internals recursion.
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_children_as_content_always_changed() {
        let mut content = ContentOption::new(
            ContentKind::VdomArray,
            Internals::Map(InternalsMap::default()),
        );
        content.children_as_content = true;
        let shared = Value::Content(Rc::new(content));
        let next = options(vec![("content", shared.clone())]);
        let prev = options(vec![("content", shared)]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_scope_objects_under_dirty_keys() {
        let scope = |v: f64| {
            let mut fields = HashMap::new();
            fields.insert("bound".to_string(), Value::Number(v));
            Value::Object(Rc::new(ObjectValue {
                fields,
                flags: ValueFlags {
                    scope_object: true,
                    ..ValueFlags::default()
                },
                proto: None,
            }))
        };
        let key = format!("{DIRTY_CHECKING_PREFIX}0");
        let next = options(vec![(key.as_str(), scope(1.0))]);
        let prev = options(vec![(key.as_str(), scope(1.0))]);
        assert!(!detect(&next, &prev).is_changed());

        let prev = options(vec![(key.as_str(), scope(2.0))]);
        assert!(detect(&next, &prev).is_changed());
    }

    #[test]
    fn test_dirty_keys_skipped_when_ignored() {
        let key = format!("{DIRTY_CHECKING_PREFIX}0");
        let next = options(vec![(key.as_str(), Value::Number(1.0))]);
        let prev = options(vec![(key.as_str(), Value::Number(2.0))]);
        let versions = VersionRegistry::new();
        let blocks = HashSet::new();
        let mut c = ctx(&versions, &blocks, false);
        c.ignore_dirty_checking = true;
        assert!(!detect_options(&next, &prev, &c, "").is_changed());
    }

    #[test]
    fn test_optimize_short_circuits() {
        let next = options(vec![("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let prev = options(vec![("a", Value::Number(9.0)), ("b", Value::Number(9.0))]);
        let versions = VersionRegistry::new();
        let blocks = HashSet::new();
        let result = detect_options(&next, &prev, &ctx(&versions, &blocks, true), "");
        assert!(matches!(result, Detection::Changed));
    }

    #[test]
    fn test_internals_update_and_insertion() {
        let mut next_entries = BTreeMap::new();
        next_entries.insert(0, Value::Number(1.0));
        next_entries.insert(1, Value::string("fresh"));
        let mut prev_entries = BTreeMap::new();
        prev_entries.insert(0, Value::Number(1.0));

        let next = InternalsMap::new(next_entries);
        let prev = InternalsMap::new(prev_entries);
        let versions = VersionRegistry::new();
        let blocks = HashSet::new();
        let result = detect_internals(&next, &prev, &ctx(&versions, &blocks, false), "");
        let map = result.into_map();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("1"));
    }

    #[test]
    fn test_internals_compound_suppresses_insertion() {
        let mut next_entries = BTreeMap::new();
        next_entries.insert(0, Value::Number(1.0));
        let next = InternalsMap::new(next_entries);
        let prev = InternalsMap::default();
        let versions = VersionRegistry::new();
        let blocks = HashSet::new();
        let mut c = ctx(&versions, &blocks, false);
        c.is_compound = true;
        assert!(!detect_internals(&next, &prev, &c, "").is_changed());
    }
}
