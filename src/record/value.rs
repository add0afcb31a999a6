//! The closed set of value shapes the upstream API emits.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Only `true` survives as a boolean; `false` means "unset" upstream.
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*x))
            }
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One field value as returned by a page of the remote query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum RawValue {
    /// `null`, an absent key, or the API's `false` marker for "unset".
    Empty,
    Scalar(Scalar),
    /// The compact `[id, label]` reference encoding.
    Reference { id: i64, label: Box<RawValue> },
    /// A nested object, usually a reference expanded with sub-fields.
    Mapping(RawRecord),
    /// A one-to-many relation or any other array.
    List(Vec<RawValue>),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Scalar(Scalar::Text(s.into()))
    }

    pub fn int(i: i64) -> Self {
        RawValue::Scalar(Scalar::Int(i))
    }

    pub fn float(x: f64) -> Self {
        RawValue::Scalar(Scalar::Float(x))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Empty)
    }

    /// Whether the value counts as "no value" for display purposes.
    ///
    /// Mirrors how the reporting sheets have always treated labels: zero,
    /// the empty string and empty containers render as blank, like `false`.
    pub fn is_falsy(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Scalar(Scalar::Bool(b)) => !b,
            RawValue::Scalar(Scalar::Int(i)) => *i == 0,
            RawValue::Scalar(Scalar::Float(x)) => *x == 0.0,
            RawValue::Scalar(Scalar::Text(s)) => s.is_empty(),
            RawValue::Reference { .. } => false,
            RawValue::Mapping(m) => m.is_empty(),
            RawValue::List(items) => items.is_empty(),
        }
    }

    /// Numeric view of a scalar, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Scalar(Scalar::Int(i)) => Some(*i as f64),
            RawValue::Scalar(Scalar::Float(x)) => Some(*x),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&RawRecord> {
        match self {
            RawValue::Mapping(m) => Some(m),
            _ => None,
        }
    }
}

/// Generic string conversion, used when no modeled shape applies.
impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Empty => Ok(()),
            RawValue::Scalar(s) => write!(f, "{}", s),
            RawValue::Reference { id, label } => write!(f, "[{}, {}]", id, label),
            RawValue::Mapping(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            RawValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => RawValue::Empty,
            Value::Bool(true) => RawValue::Scalar(Scalar::Bool(true)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::int(i),
                None => RawValue::float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => RawValue::text(s),
            Value::Array(items) => {
                let is_reference = items.len() == 2
                    && items[0].is_i64()
                    && !matches!(items[1], Value::Array(_) | Value::Object(_));
                if is_reference {
                    let mut it = items.into_iter();
                    let id = it.next().and_then(|v| v.as_i64()).unwrap_or_default();
                    let label = it.next().map(RawValue::from).unwrap_or(RawValue::Empty);
                    RawValue::Reference {
                        id,
                        label: Box::new(label),
                    }
                } else {
                    RawValue::List(items.into_iter().map(RawValue::from).collect())
                }
            }
            Value::Object(map) => RawValue::Mapping(RawRecord::from(map)),
        }
    }
}

/// An ordered field-name to value mapping.
///
/// Field order follows the source document; lookups are linear, which is
/// fine for the couple dozen fields an ERP record carries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, Value>")]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces an existing field of the same name.
    pub fn with(mut self, name: impl Into<String>, value: RawValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: RawValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &RawValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for RawRecord {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect(),
        }
    }
}

impl FromIterator<(String, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}
