use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

// ═══════════════════════════════════════════════════════════════════════════════
// DYNAMIC VALUE MODEL
// ═══════════════════════════════════════════════════════════════════════════════

/// A value as handed to the reconciler by generated template code.
///
/// Identity (the host language's reference equality) is `Rc` pointer identity;
/// primitives carry their identity in the value itself. Cloning a `Value` never
/// clones the underlying object, so two clones of the same `Value` stay
/// identical for diffing purposes.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// Plain object, possibly carrying marker flags and a prototype link.
    Object(Rc<ObjectValue>),
    Array(Rc<ArrayValue>),
    /// Object exposing an explicit version counter instead of structural equality.
    Versioned(Rc<Versioned>),
    /// Array specialization of the version counter protocol.
    VersionedArray(Rc<VersionedArray>),
    /// Opaque closure (event handlers, validators). Identity-compared only.
    Function(Rc<FunctionValue>),
    /// A nested renderable template passed as an option ("slot").
    Content(Rc<ContentOption>),
}

/// Marker flags the code generator plants on plain objects. On the wire these
/// are ordinary boolean properties (`_ignoreChanging` and friends); here they
/// are lifted out of the field map at construction time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueFlags {
    /// `_ignoreChanging`: the value never triggers a change.
    pub ignore_changing: bool,
    /// `_isDeepChecking`: forces structural comparison instead of reference.
    pub deep_checking: bool,
    /// `_preferVersionAPI`: compare by version counter even when references differ.
    pub prefer_version_api: bool,
    /// `_$internal`: a scope object whose fields flatten into the parent namespace.
    pub scope_object: bool,
}

#[derive(Debug, Default)]
pub struct ObjectValue {
    pub fields: HashMap<String, Value>,
    pub flags: ValueFlags,
    /// Prototype link. Old generated code reads options through the prototype
    /// chain, so enumeration and lookup must reach inherited keys too.
    pub proto: Option<Rc<ObjectValue>>,
}

impl ObjectValue {
    /// Looks a key up through the prototype chain.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key) {
            Some(v) => Some(v),
            None => self.proto.as_deref().and_then(|p| p.get(key)),
        }
    }

    /// True when the key exists as an own or inherited property, even if its
    /// value is `Undefined`.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.proto.as_deref().is_some_and(|p| p.has(key))
    }

    /// All own and inherited keys, deterministically ordered.
    pub fn keys(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut BTreeSet<String>) {
        for key in self.fields.keys() {
            out.insert(key.clone());
        }
        if let Some(proto) = self.proto.as_deref() {
            proto.collect_keys(out);
        }
    }
}

#[derive(Debug, Default)]
pub struct ArrayValue {
    pub items: Vec<Value>,
}

/// An entity with a stable identity and an explicit version counter. The
/// counter is the only change signal: logical content may mutate in place.
#[derive(Debug)]
pub struct Versioned {
    version: Cell<u64>,
    /// `_preferVersionAPI` for versionables: wrappers that are rebuilt every
    /// render but keep their version counter.
    pub prefer_version_api: bool,
}

impl Versioned {
    pub fn new(version: u64) -> Self {
        Versioned {
            version: Cell::new(version),
            prefer_version_api: false,
        }
    }

    pub fn with_prefer_version_api(version: u64) -> Self {
        Versioned {
            version: Cell::new(version),
            prefer_version_api: true,
        }
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Bumps the counter without touching identity.
    pub fn set_version(&self, version: u64) {
        self.version.set(version);
    }
}

#[derive(Debug, Default)]
pub struct VersionedArray {
    pub items: Vec<Value>,
    version: Cell<u64>,
}

impl VersionedArray {
    pub fn new(items: Vec<Value>, version: u64) -> Self {
        VersionedArray {
            items,
            version: Cell::new(version),
        }
    }

    pub fn array_version(&self) -> u64 {
        self.version.get()
    }

    pub fn set_array_version(&self, version: u64) {
        self.version.set(version);
    }
}

/// Identity-only stand-in for a host closure.
#[derive(Debug, Default)]
pub struct FunctionValue;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// The three wire encodings of a content option, tagged at construction time
/// by the generator boundary instead of shape-sniffed during diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// Legacy closure carrying `.internal` directly (`isWasabyTemplate: false`).
    Ws3Closure,
    /// Function doubling as a single-record data array (`isDataArray` + `.array`).
    VdomArray,
    /// Plain single-record data array (`isDataArray`, no wrapper function).
    PlainArray,
}

#[derive(Debug)]
pub struct ContentOption {
    pub kind: ContentKind,
    /// The single contained record's internals collection. The wrapper
    /// function/array identity is not separately meaningful.
    pub internal: Internals,
    /// Children promoted into a content option. Equality cannot be proven
    /// locally, so such values always report changed; the receiving component
    /// optimizes on its own.
    pub children_as_content: bool,
}

impl ContentOption {
    pub fn new(kind: ContentKind, internal: Internals) -> Self {
        ContentOption {
            kind,
            internal,
            children_as_content: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERNALS COLLECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiler-synthesized bindings local to a template body. Old generated code
/// ships shapes the current contract forbids; those arrive as `Legacy` and are
/// never diffed, only escalated.
#[derive(Debug)]
pub enum Internals {
    Map(InternalsMap),
    /// Unrecognized legacy payload. Kept verbatim for diagnostics.
    Legacy(Value),
}

#[derive(Debug, Default)]
pub struct InternalsMap {
    pub entries: BTreeMap<u32, Value>,
    /// Diagnostic sentinel planted by the compiler when an internal expression
    /// could not be evaluated in its original context. Forces re-evaluation.
    pub unreachable_getter_path: bool,
}

impl InternalsMap {
    pub fn new(entries: BTreeMap<u32, Value>) -> Self {
        InternalsMap {
            entries,
            unreachable_getter_path: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE HELPERS & JSON INTEROP
// ═══════════════════════════════════════════════════════════════════════════════

/// Wire names of the marker flags as they appear on JSON payloads.
const FLAG_IGNORE_CHANGING: &str = "_ignoreChanging";
const FLAG_DEEP_CHECKING: &str = "_isDeepChecking";
const FLAG_PREFER_VERSION_API: &str = "_preferVersionAPI";
const FLAG_SCOPE_OBJECT: &str = "_$internal";

impl Value {
    /// Host-language truthiness. `NaN`, `0`, `""`, `null`, `undefined` and
    /// `false` are falsy; every object is truthy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn object(fields: HashMap<String, Value>) -> Value {
        Value::Object(Rc::new(ObjectValue {
            fields,
            flags: ValueFlags::default(),
            proto: None,
        }))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(ArrayValue { items }))
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }

    pub fn func() -> Value {
        Value::Function(Rc::new(FunctionValue))
    }

    /// Builds a value graph from a JSON payload (fixtures, bridge traffic).
    /// Marker flag properties are lifted off objects into `ValueFlags`; the
    /// JSON subset cannot express functions, versionables or content options.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut flags = ValueFlags::default();
                let mut fields = HashMap::new();
                for (key, raw) in map {
                    let on = raw.as_bool() == Some(true);
                    match key.as_str() {
                        FLAG_IGNORE_CHANGING if on => flags.ignore_changing = true,
                        FLAG_DEEP_CHECKING if on => flags.deep_checking = true,
                        FLAG_PREFER_VERSION_API if on => flags.prefer_version_api = true,
                        FLAG_SCOPE_OBJECT if on => flags.scope_object = true,
                        _ => {
                            fields.insert(key.clone(), Value::from_json(raw));
                        }
                    }
                }
                Value::Object(Rc::new(ObjectValue {
                    fields,
                    flags,
                    proto: None,
                }))
            }
        }
    }

    /// Projects the plain subset back to JSON. Functions, versionables and
    /// content options have no JSON representation and collapse to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.items.iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => {
                let mut map = serde_json::Map::new();
                for key in obj.keys() {
                    if let Some(value) = obj.get(&key) {
                        map.insert(key, value.to_json());
                    }
                }
                serde_json::Value::Object(map)
            }
            Value::VersionedArray(_)
            | Value::Versioned(_)
            | Value::Function(_)
            | Value::Content(_) => serde_json::Value::Null,
        }
    }
}
