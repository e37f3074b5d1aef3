//! N-API bridge for the JS host.
//!
//! JSON payloads cover the plain-value subset only: marker flags arrive as
//! ordinary boolean properties and are lifted at the boundary, but functions,
//! versionables and content options cannot cross this bridge. The host keeps
//! those comparisons on its side.

use crate::options::{get_changed_options, Changes, DiffConfig};
use crate::value::Value;
use napi_derive::napi;

#[napi]
pub fn bridge_probe() -> String {
    "Wasaby Native Bridge Connected".to_string()
}

/// Diffs two plain options payloads. Returns the changed-keys map, or `false`
/// when nothing changed.
#[napi]
pub fn get_changed_options_json(
    next: serde_json::Value,
    prev: serde_json::Value,
) -> serde_json::Value {
    let next = as_options(&next);
    let prev = as_options(&prev);

    let next_ref = match &next {
        Some(Value::Object(o)) => Some(o.as_ref()),
        _ => None,
    };
    let prev_ref = match &prev {
        Some(Value::Object(o)) => Some(o.as_ref()),
        _ => None,
    };

    let config = DiffConfig::default();
    match get_changed_options(next_ref, prev_ref, &config) {
        Changes::Unchanged => serde_json::Value::Bool(false),
        Changes::Changed | Changes::Unknown => serde_json::Value::Bool(true),
        Changes::Map(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                out.insert(key, value.to_json());
            }
            serde_json::Value::Object(out)
        }
    }
}

fn as_options(payload: &serde_json::Value) -> Option<Value> {
    match payload {
        serde_json::Value::Object(_) => Some(Value::from_json(payload)),
        _ => None,
    }
}
