//! Value classification predicates.
//!
//! Every predicate is total: any `Value`, including `Undefined` and `Null`,
//! yields a boolean. Legacy payloads must never make classification panic.

use crate::value::{ContentKind, Value};
use std::rc::Rc;

pub fn is_versionable(value: &Value) -> bool {
    matches!(value, Value::Versioned(_))
}

pub fn is_versionable_array(value: &Value) -> bool {
    matches!(value, Value::VersionedArray(_))
}

pub fn is_ws3_content_option(value: &Value) -> bool {
    matches!(value, Value::Content(c) if c.kind == ContentKind::Ws3Closure)
}

pub fn is_vdom_content_option(value: &Value) -> bool {
    matches!(value, Value::Content(c) if c.kind == ContentKind::VdomArray)
}

pub fn is_plain_array_content_option(value: &Value) -> bool {
    matches!(value, Value::Content(c) if c.kind == ContentKind::PlainArray)
}

pub fn is_content_option(value: &Value) -> bool {
    matches!(value, Value::Content(_))
}

/// The two current-generation encodings. Legacy closures are excluded: their
/// internals are compared through the closure itself, not the wrapper.
pub fn is_ws4_content_option(value: &Value) -> bool {
    matches!(
        value,
        Value::Content(c) if c.kind != ContentKind::Ws3Closure
    )
}

pub fn should_ignore_changing(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.flags.ignore_changing)
}

pub fn should_check_deep(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.flags.deep_checking)
}

/// `_preferVersionAPI`: the wrapper is rebuilt every render, only the version
/// counter is meaningful.
pub fn should_check_versions(value: &Value) -> bool {
    matches!(value, Value::Versioned(v) if v.prefer_version_api)
}

/// `_$internal`: a scope object whose fields flatten into the parent
/// comparison namespace.
pub fn is_scope_object(value: &Value) -> bool {
    matches!(value, Value::Object(o) if o.flags.scope_object)
}

/// Children promoted into a content option; always reported changed because
/// equality cannot be proven locally.
pub fn is_children_as_content(value: &Value) -> bool {
    matches!(value, Value::Content(c) if c.children_as_content)
}

/// `NaN !== NaN` under strict equality; the reconciler treats two NaNs as
/// equal to avoid redraw storms on unset numeric options.
pub fn are_both_nan(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan())
}

/// Reference-equality fast path. Heap values compare by pointer identity,
/// primitives by value (with the both-NaN special case).
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Versioned(x), Value::Versioned(y)) => Rc::ptr_eq(x, y),
        (Value::VersionedArray(x), Value::VersionedArray(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Content(x), Value::Content(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}
