//! Dynamic state tree.
use kyute_common::{Atom, Data};
use serde::{ser::SerializeMap, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, rc::Rc};

/// Map node of the state tree.
pub type Map = BTreeMap<Atom, Value>;

/// A node of the state tree.
///
/// Containers are reference-counted and never mutated in place: cloning a `Value` shares the
/// underlying container, and "modifying" a container produces a new allocation. This is what
/// makes `Data::same` a reliable change detector, since an unchanged sub-tree keeps its identity
/// across state transitions.
#[derive(Clone, Default)]
pub enum Value {
    /// The absent value, produced by lookups of missing properties.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Map(Rc<Map>),
}

impl Value {
    /// Creates an empty map.
    pub fn map() -> Value {
        Value::Map(Rc::new(Map::new()))
    }

    /// Creates a map from key-value pairs.
    pub fn map_from<K: Into<Atom>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Value {
        Value::Map(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }

    /// Converts a JSON value.
    pub fn from_json(json: serde_json::Value) -> Value {
        json.into()
    }

    /// Returns the runtime type name of the value, using javascript names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Looks up a property.
    ///
    /// On maps, this is a key lookup. On lists, `key` must be a canonical decimal index (`"0"`,
    /// `"12"`, but not `"012"` or `"+1"`). Returns `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(list) => list_index(key).and_then(|i| list.get(i)),
            _ => None,
        }
    }

    /// Looks up a property, returning `Value::Undefined` if it doesn't exist.
    pub fn property(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Returns a map with `key` set to `value`.
    ///
    /// The other entries are shared with `self`. If `self` is not a map, the result is a map with
    /// a single entry.
    #[must_use]
    pub fn with(&self, key: impl Into<Atom>, value: impl Into<Value>) -> Value {
        let mut map = self.as_map().cloned().unwrap_or_default();
        map.insert(key.into(), value.into());
        Value::Map(Rc::new(map))
    }

    /// Returns a map without `key`. Returns a clone of `self` if there is nothing to remove.
    #[must_use]
    pub fn without(&self, key: &str) -> Value {
        match self {
            Value::Map(map) if map.contains_key(key) => {
                let mut map = (**map).clone();
                map.remove(key);
                Value::Map(Rc::new(map))
            }
            _ => self.clone(),
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Float(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to JSON. `Undefined` becomes `null`; map entries whose value is `Undefined` are
    /// omitted.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(v) => (*v).into(),
            Value::Int(v) => (*v).into(),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::List(list) => list.iter().map(Value::to_json).collect(),
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn list_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

impl Data for Value {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.same(b),
            (Value::Map(a), Value::Map(b)) => a.same(b),
            _ => false,
        }
    }
}

/// Structural equality, unlike `Data::same` which compares containers by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Debug::fmt(v, f),
            Value::Int(v) => fmt::Debug::fmt(v, f),
            Value::Float(v) => fmt::Debug::fmt(v, f),
            Value::Str(v) => fmt::Debug::fmt(v, f),
            Value::List(v) => f.debug_list().entries(v.iter()).finish(),
            Value::Map(v) => f.debug_map().entries(v.iter().map(|(k, v)| (k.as_str(), v))).finish(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Conversions

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v.into())
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Atom> for Value {
    fn from(v: Atom) -> Self {
        Value::Str(v.as_str().into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Rc::new(v))
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(Rc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(list) => list.into_iter().map(Value::from).collect::<Vec<_>>().into(),
            serde_json::Value::Object(map) => Value::map_from(map.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for item in list.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let entries = map.iter().filter(|(_, v)| !v.is_undefined());
                let mut s = serializer.serialize_map(None)?;
                for (k, v) in entries {
                    s.serialize_entry(k.as_str(), v)?;
                }
                s.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
