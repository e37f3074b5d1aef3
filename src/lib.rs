//! # Wasaby Reconciler Ground Truth (Change Detection Core)
//!
//! ## Diffing Invariants
//!
//! 1. **Escalation Bias**: whenever equality cannot be proven, the verdict is
//!    "changed". Extra redraws are a performance cost; missed redraws are
//!    correctness bugs. `Changes::Unknown` is the explicit escalation variant.
//!
//! 2. **Never Throw**: the comparison path accepts any value shape, including
//!    payloads from old code generators, without panicking. Classification is
//!    done with total predicates, never with assertions.
//!
//! 3. **Version Over Reference**: a versionable value with stable identity
//!    still reports changed when its counter diverges from the registry
//!    snapshot taken at the previous render.
//!
//! 4. **Content Options Compare By Internals**: the wrapper identity of a
//!    current-generation content option is meaningless; only its internals
//!    collection decides. Legacy (WS3) closures compare by identity alone.
//!
//! 5. **Block Options Are A Parameter**: structural comparison is opted into
//!    per top-level option name, passed down as an explicit set. Values are
//!    never mutated to carry the opt-in.
//!
//! 6. **Synchronous & Pure**: no I/O, no timers, no shared mutable state. One
//!    call per candidate re-render, run to completion.

mod classify;
mod detect;
mod options;
mod value;
mod versions;

#[cfg(feature = "napi")]
mod bridge;


pub use classify::{
    are_both_nan, is_children_as_content, is_content_option, is_plain_array_content_option,
    is_scope_object, is_vdom_content_option, is_versionable, is_versionable_array,
    is_ws3_content_option, is_ws4_content_option, should_check_deep, should_check_versions,
    should_ignore_changing, values_identical,
};
pub use detect::{
    detect_internals, detect_options, DetectCtx, Detection, DIRTY_CHECKING_PREFIX,
};
pub use options::{get_changed_internals, get_changed_options, Changes, DiffConfig};
pub use value::{
    ArrayValue, ContentKind, ContentOption, FunctionValue, Internals, InternalsMap, ObjectValue,
    Value, ValueFlags, Versioned, VersionedArray,
};
pub use versions::{collect_internals_versions, collect_object_versions, VersionRegistry};

#[cfg(feature = "napi")]
pub use bridge::{bridge_probe, get_changed_options_json};
