//! Public entry points of the diffing core.
//!
//! `get_changed_options` and `get_changed_internals` normalize argument
//! defaults, absorb the one-side-missing edge cases and dispatch into the
//! change detector with the right container handling.

use crate::detect::{detect_internals, detect_options, DetectCtx, Detection};
use crate::value::{Internals, ObjectValue, Value};
use crate::versions::VersionRegistry;
use std::collections::{HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// DIFF CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

pub struct DiffConfig<'a> {
    /// Version counters captured at the previous render. Empty by default.
    pub versions: Option<&'a VersionRegistry>,
    /// Top-level option names opted into structural comparison instead of
    /// reference-only. Travels through recursion as an explicit parameter.
    pub block_option_names: HashSet<String>,
    pub ignore_dirty_checking: bool,
    pub is_compound: bool,
    /// Return a bare verdict on the first changed key instead of the full map.
    pub optimize: bool,
}

impl<'a> Default for DiffConfig<'a> {
    fn default() -> Self {
        DiffConfig {
            versions: None,
            block_option_names: HashSet::new(),
            ignore_dirty_checking: false,
            is_compound: false,
            optimize: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT TAXONOMY
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a diff. `Unknown` is the escalation variant: the input could not
/// be diffed safely, so the caller must re-render.
#[derive(Debug)]
pub enum Changes {
    Unchanged,
    /// Verdict from an `optimize` run; no key enumeration.
    Changed,
    /// Changed keys with their next-side values, verbatim.
    Map(HashMap<String, Value>),
    /// Unrecognized or sentinel-marked input. Treated as changed.
    Unknown,
}

impl Changes {
    pub fn is_changed(&self) -> bool {
        match self {
            Changes::Unchanged => false,
            Changes::Changed | Changes::Unknown => true,
            Changes::Map(map) => !map.is_empty(),
        }
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        match self {
            Changes::Map(map) => map,
            _ => HashMap::new(),
        }
    }
}

impl From<Detection> for Changes {
    fn from(detection: Detection) -> Changes {
        match detection {
            Detection::Unchanged => Changes::Unchanged,
            Detection::Changed => Changes::Changed,
            Detection::Map(map) => {
                if map.is_empty() {
                    Changes::Unchanged
                } else {
                    Changes::Map(map)
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FACADE
// ═══════════════════════════════════════════════════════════════════════════════

/// Diffs two options containers. An absent side diffs as an empty container,
/// so insertions against an absent prev still report; both sides absent is a
/// no-op.
pub fn get_changed_options(
    next: Option<&ObjectValue>,
    prev: Option<&ObjectValue>,
    config: &DiffConfig,
) -> Changes {
    if next.is_none() && prev.is_none() {
        return Changes::Unchanged;
    }
    let empty = ObjectValue::default();
    let empty_versions = VersionRegistry::new();
    let ctx = DetectCtx {
        versions: config.versions.unwrap_or(&empty_versions),
        block_names: &config.block_option_names,
        ignore_dirty_checking: config.ignore_dirty_checking,
        is_compound: config.is_compound,
        optimize: config.optimize,
    };
    detect_options(
        next.unwrap_or(&empty),
        prev.unwrap_or(&empty),
        &ctx,
        "",
    )
    .into()
}

/// Diffs two internals collections. Unlike the options path, a missing side
/// means "nothing to compare": no insertion/removal reporting against absence.
/// Legacy-shaped payloads and the unreachable-getter-path sentinel escalate to
/// `Unknown` (forced re-render).
pub fn get_changed_internals(
    next: Option<&Internals>,
    prev: Option<&Internals>,
    config: &DiffConfig,
) -> Changes {
    let (Some(next), Some(prev)) = (next, prev) else {
        return Changes::Unchanged;
    };

    let (next_map, prev_map) = match (next, prev) {
        (Internals::Map(n), Internals::Map(p)) => (n, p),
        _ => {
            eprintln!("[WasabyNative] unrecognized internals shape, forcing update");
            return Changes::Unknown;
        }
    };

    if next_map.unreachable_getter_path || prev_map.unreachable_getter_path {
        // The compiler could not evaluate an internal expression in its
        // original context; re-evaluate in the correct one.
        eprintln!("[WasabyNative] internals carry an unreachable getter path, forcing update");
        return Changes::Unknown;
    }

    let empty_versions = VersionRegistry::new();
    let ctx = DetectCtx {
        versions: config.versions.unwrap_or(&empty_versions),
        block_names: &config.block_option_names,
        ignore_dirty_checking: config.ignore_dirty_checking,
        is_compound: config.is_compound,
        optimize: config.optimize,
    };
    detect_internals(next_map, prev_map, &ctx, "").into()
}
