use std::{collections::{BTreeMap, HashMap}, fmt, sync::Arc};
use serde::Serialize;
use crate::reflect::{Reflect, Reflected};
use crate::json::JsonValue;


pub type Mapping = BTreeMap<String, Value>;

/// Data a template is rendered against.
///
/// Collections are shared behind [Arc] so that scopes and lookups clone
/// cheaply; writing through a [Scope](crate::Scope) copies on write.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    Text(String),
    Sequence(Arc<Vec<Value>>),
    Mapping(Arc<Mapping>),
    Object(Arc<dyn Reflected>),
}

impl Value {
    pub fn text(t: &str) -> Value {
        Value::Text(t.to_owned())
    }

    pub fn sequence(sequence: Vec<Value>) -> Value {
        Value::Sequence(Arc::new(sequence))
    }

    pub fn mapping(mapping: Mapping) -> Value {
        Value::Mapping(Arc::new(mapping))
    }

    pub fn empty_mapping() -> Value {
        Value::mapping(Mapping::new())
    }

    /// Wrap a value whose members are read through [Reflect].
    pub fn object<T: Reflect>(object: T) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Convert any serializable value, going through its JSON form.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value(value).map(Value::from)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Object(_) => "object",
        }
    }

    /// Look a single member up in the key/value view of this value.
    pub fn member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Mapping(mapping) => mapping.get(name).cloned(),
            Value::Object(object) => object.member(name),
            Value::Sequence(seq) => match name {
                "Count" | "count" => Some(Value::Int(seq.len() as i64)),
                _ => name.parse::<usize>().ok()
                    .and_then(|index| seq.get(index))
                    .cloned(),
            },
            Value::Text(text) => match name {
                "Length" | "length" => Some(Value::Int(text.chars().count() as i64)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Items visited when the value is iterated by a looping tag.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Value::Sequence(seq) => seq.as_ref().clone(),
            Value::Mapping(mapping) => mapping.iter()
                .map(|(key, value)| {
                    let mut entry = Mapping::new();
                    entry.insert("key".to_owned(), Value::text(key));
                    entry.insert("value".to_owned(), value.clone());
                    Value::mapping(entry)
                })
                .collect(),
            Value::Text(text) => text.chars().map(Value::Char).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether iterating the value is meaningful at all.
    pub fn is_enumerable(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Mapping(_) | Value::Text(_))
    }

    /// Write `value` at the dotted `path` below this value, creating empty
    /// mappings for missing intermediate members.
    pub(crate) fn assign(&mut self, path: &[&str], value: Value) {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return;
        };
        let mapping = self.as_mapping_mut();
        if rest.is_empty() {
            mapping.insert((*first).to_owned(), value);
        } else {
            mapping.entry((*first).to_owned())
                .or_insert_with(Value::empty_mapping)
                .assign(rest, value);
        }
    }

    fn as_mapping_mut(&mut self) -> &mut Mapping {
        if let Value::Object(object) = self {
            let materialized = object.members().into_iter().collect::<Mapping>();
            *self = Value::mapping(materialized);
        }
        if !matches!(self, Value::Mapping(_)) {
            *self = Value::empty_mapping();
        }
        match self {
            Value::Mapping(mapping) => Arc::make_mut(mapping),
            _ => unreachable!("value was just replaced by a mapping"),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Char(c) => JsonValue::String(c.to_string()),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            Value::Text(text) => JsonValue::String(text.clone()),
            Value::Sequence(seq) => JsonValue::Array(
                seq.iter().map(Value::to_json).collect()
            ),
            Value::Mapping(mapping) => JsonValue::Object(
                mapping.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect()
            ),
            Value::Object(object) => JsonValue::Object(
                object.members().into_iter()
                    .map(|(key, value)| (key, value.to_json()))
                    .collect()
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({:?})", b),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::Int(i) => write!(f, "Int({:?})", i),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::Text(t) => write!(f, "Text({:?})", t),
            Value::Sequence(seq) => f.debug_list().entries(seq.iter()).finish(),
            Value::Mapping(mapping) => f.debug_map().entries(mapping.iter()).finish(),
            Value::Object(object) => write!(f, "Object({})", object.type_name()),
        }
    }
}


impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i as i64)
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Value::Float(u as f64), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Value::from(u as u64)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::text(t)
    }
}

impl From<String> for Value {
    fn from(t: String) -> Self {
        Value::Text(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(seq: Vec<T>) -> Self {
        Value::sequence(seq.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(mapping: BTreeMap<String, T>) -> Self {
        Value::mapping(
            mapping.into_iter().map(|(k, v)| (k, v.into())).collect()
        )
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(mapping: HashMap<String, T>) -> Self {
        Value::mapping(
            mapping.into_iter().map(|(k, v)| (k, v.into())).collect()
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::mapping(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
        )
    }
}
