//! Immutable JSON-like state values
//!
//! A [`Snapshot`] is the entire observable state at one instant. Composite
//! variants keep their contents behind an `Arc`, so cloning a snapshot is
//! O(1) and two clones of the same composite share identity. That identity
//! is what the shallow equality check relies on.
//!
//! # Example
//!
//! ```rust
//! use state_store::{shallow_merge, Snapshot};
//!
//! let base = Snapshot::from(serde_json::json!({ "count": 0, "label": "clicks" }));
//! let next = shallow_merge(&base, &Snapshot::from(serde_json::json!({ "count": 1 })));
//!
//! assert_eq!(next["count"].as_i64(), Some(1));
//! assert_eq!(next["label"].as_str(), Some("clicks"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

/// Key/value storage for [`Snapshot::Object`]
pub type Map = BTreeMap<String, Snapshot>;

static NULL: Snapshot = Snapshot::Null;

/// An immutable, arbitrarily nested state value
///
/// `PartialEq` is a full value comparison. Change detection inside the
/// store does not use it; see [`crate::equality::shallow_equal`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Snapshot {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Snapshot>>),
    Object(Arc<Map>),
}

impl Snapshot {
    /// Build an object snapshot from key/value pairs
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Snapshot>,
        I: IntoIterator<Item = (K, V)>,
    {
        Snapshot::Object(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// An object snapshot with no keys
    pub fn empty_object() -> Self {
        Snapshot::Object(Arc::new(Map::new()))
    }

    /// Look up a key on an object snapshot
    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        match self {
            Snapshot::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Look up an index on an array snapshot
    pub fn at(&self, index: usize) -> Option<&Snapshot> {
        match self {
            Snapshot::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Return a new object with `key` set to `value`
    ///
    /// Every other entry is shared with `self`. A non-object receiver is
    /// treated as an empty object.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Snapshot>) -> Snapshot {
        let mut map = match self {
            Snapshot::Object(map) => Map::clone(map),
            _ => Map::new(),
        };
        map.insert(key.into(), value.into());
        Snapshot::Object(Arc::new(map))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Snapshot::Null)
    }

    /// Whether this is an array or an object
    pub fn is_composite(&self) -> bool {
        matches!(self, Snapshot::Array(_) | Snapshot::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Snapshot::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Snapshot::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Snapshot::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Snapshot::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Snapshot::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Snapshot]> {
        match self {
            Snapshot::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Snapshot::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Number of top-level entries (0 for scalars)
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Array(items) => items.len(),
            Snapshot::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shallow top-level merge
///
/// Two objects produce a new object holding every key of `base`, overridden
/// by every key of `patch`. Nested values are shared, never merged. A patch
/// that is not an object has no keys, so an object base comes back as is.
/// Over a non-object base the patch is taken whole.
pub fn shallow_merge(base: &Snapshot, patch: &Snapshot) -> Snapshot {
    match (base, patch) {
        (Snapshot::Object(base), Snapshot::Object(patch)) => {
            let mut merged = Map::clone(base);
            for (key, value) in patch.iter() {
                merged.insert(key.clone(), value.clone());
            }
            Snapshot::Object(Arc::new(merged))
        }
        (Snapshot::Object(_), _) => base.clone(),
        _ => patch.clone(),
    }
}

impl Index<&str> for Snapshot {
    type Output = Snapshot;

    /// Missing keys and non-objects index to `Null`
    fn index(&self, key: &str) -> &Snapshot {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Snapshot {
    type Output = Snapshot;

    fn index(&self, index: usize) -> &Snapshot {
        self.at(index).unwrap_or(&NULL)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unprintable snapshot>"),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<serde_json::Value> for Snapshot {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Snapshot::Null,
            serde_json::Value::Bool(b) => Snapshot::Bool(b),
            serde_json::Value::Number(n) => Snapshot::Number(n),
            serde_json::Value::String(s) => Snapshot::String(s.into()),
            serde_json::Value::Array(items) => {
                Snapshot::Array(Arc::new(items.into_iter().map(Snapshot::from).collect()))
            }
            serde_json::Value::Object(map) => Snapshot::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Snapshot::from(v))).collect(),
            )),
        }
    }
}

impl From<&Snapshot> for serde_json::Value {
    fn from(snapshot: &Snapshot) -> Self {
        match snapshot {
            Snapshot::Null => serde_json::Value::Null,
            Snapshot::Bool(b) => serde_json::Value::Bool(*b),
            Snapshot::Number(n) => serde_json::Value::Number(n.clone()),
            Snapshot::String(s) => serde_json::Value::String(s.to_string()),
            Snapshot::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Snapshot::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Snapshot> for serde_json::Value {
    fn from(snapshot: Snapshot) -> Self {
        serde_json::Value::from(&snapshot)
    }
}

impl From<()> for Snapshot {
    fn from(_: ()) -> Self {
        Snapshot::Null
    }
}

impl From<bool> for Snapshot {
    fn from(b: bool) -> Self {
        Snapshot::Bool(b)
    }
}

impl From<i32> for Snapshot {
    fn from(n: i32) -> Self {
        Snapshot::Number(n.into())
    }
}

impl From<i64> for Snapshot {
    fn from(n: i64) -> Self {
        Snapshot::Number(n.into())
    }
}

impl From<u32> for Snapshot {
    fn from(n: u32) -> Self {
        Snapshot::Number(n.into())
    }
}

impl From<u64> for Snapshot {
    fn from(n: u64) -> Self {
        Snapshot::Number(n.into())
    }
}

impl From<f64> for Snapshot {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Snapshot::Null, Snapshot::Number)
    }
}

impl From<&str> for Snapshot {
    fn from(s: &str) -> Self {
        Snapshot::String(s.into())
    }
}

impl From<String> for Snapshot {
    fn from(s: String) -> Self {
        Snapshot::String(s.into())
    }
}

impl From<Vec<Snapshot>> for Snapshot {
    fn from(items: Vec<Snapshot>) -> Self {
        Snapshot::Array(Arc::new(items))
    }
}

impl From<Map> for Snapshot {
    fn from(map: Map) -> Self {
        Snapshot::Object(Arc::new(map))
    }
}

impl<T: Into<Snapshot>> From<Option<T>> for Snapshot {
    fn from(value: Option<T>) -> Self {
        value.map_or(Snapshot::Null, Into::into)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Snapshot::Null => serializer.serialize_unit(),
            Snapshot::Bool(b) => serializer.serialize_bool(*b),
            Snapshot::Number(n) => n.serialize(serializer),
            Snapshot::String(s) => serializer.serialize_str(s),
            Snapshot::Array(items) => serializer.collect_seq(items.iter()),
            Snapshot::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Snapshot::from)
    }
}
