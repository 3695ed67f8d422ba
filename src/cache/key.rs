//! Key Module
//!
//! Value types used for lookups: `KeyPart` (a hashable mirror of a JSON
//! value), `CompoundKey` (ordered key components of a call) and `Identifier`
//! (the deduplication key of a pooled domain object).

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Number, Value};

// == Key Part ==
/// Hashable, deeply comparable mirror of a JSON value.
///
/// Floats compare by their bit pattern with `-0.0` folded into `0.0`, so
/// equality stays reflexive. Objects compare as sorted maps, independent of
/// member order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Text(String),
    List(Vec<KeyPart>),
    Map(BTreeMap<String, KeyPart>),
}

impl KeyPart {
    /// Returns true for numbers and text, the natural identifier scalars.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            KeyPart::Int(_) | KeyPart::UInt(_) | KeyPart::Float(_) | KeyPart::Text(_)
        )
    }

    /// Converts back into a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            KeyPart::Null => Value::Null,
            KeyPart::Bool(b) => Value::Bool(*b),
            KeyPart::Int(i) => Value::from(*i),
            KeyPart::UInt(u) => Value::from(*u),
            KeyPart::Float(bits) => Number::from_f64(f64::from_bits(*bits))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            KeyPart::Text(s) => Value::String(s.clone()),
            KeyPart::List(items) => Value::Array(items.iter().map(KeyPart::to_value).collect()),
            KeyPart::Map(members) => Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    KeyPart::Int(i)
                } else if let Some(u) = n.as_u64() {
                    KeyPart::UInt(u)
                } else {
                    let f = n.as_f64().unwrap_or(0.0);
                    let f = if f == 0.0 { 0.0 } else { f };
                    KeyPart::Float(f.to_bits())
                }
            }
            Value::String(s) => KeyPart::Text(s.clone()),
            Value::Array(items) => KeyPart::List(items.iter().map(KeyPart::from).collect()),
            Value::Object(members) => KeyPart::Map(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), KeyPart::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

// == Compound Key ==
/// Ordered, structurally compared sequence of key components.
///
/// An invocation without key-bearing arguments maps to the canonical empty
/// key, [`CompoundKey::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CompoundKey(Vec<KeyPart>);

impl CompoundKey {
    /// Creates a key from already converted components.
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Canonical key for calls without key-bearing arguments.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds a key from argument values, preserving their order.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        Self(values.into_iter().map(KeyPart::from).collect())
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key components as a JSON array.
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(KeyPart::to_value).collect())
    }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, "]")
    }
}

// == Identifier ==
/// Deduplication key of a domain object in the value pool.
///
/// `Single` holds one id field value or the object's own scalar value,
/// `Compound` holds the values of several declared id fields in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Single(KeyPart),
    Compound(Vec<KeyPart>),
}

impl Identifier {
    /// Identifier from a single JSON value.
    pub fn of(value: &Value) -> Self {
        Identifier::Single(KeyPart::from(value))
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Single(KeyPart::Int(value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Single(KeyPart::from(value))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Single(part) => write!(f, "{}", part),
            Identifier::Compound(parts) => write!(f, "{}", CompoundKey::new(parts.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_compound_key_deep_equality() {
        let a1 = json!({"name": "alice", "tags": [1, 2]});
        let a2 = json!({"tags": [1, 2], "name": "alice"});

        let k1 = CompoundKey::from_values([&a1, &Value::Null, &json!("x")]);
        let k2 = CompoundKey::from_values([&a2, &Value::Null, &json!("x")]);

        assert_eq!(k1, k2);
        assert_eq!(k2, k1);
        assert_eq!(hash_of(&k1), hash_of(&k2));
    }

    #[test]
    fn test_compound_key_order_sensitive() {
        let k1 = CompoundKey::from_values([&json!(1), &json!("x")]);
        let k2 = CompoundKey::from_values([&json!("x"), &json!(1)]);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_empty_key_is_canonical() {
        let no_args: Vec<Value> = Vec::new();
        assert_eq!(CompoundKey::from_values(&no_args), CompoundKey::empty());
        assert!(CompoundKey::empty().is_empty());
    }

    #[test]
    fn test_float_zero_normalized() {
        assert_eq!(KeyPart::from(&json!(0.0)), KeyPart::from(&json!(-0.0)));
        assert_eq!(KeyPart::from(&json!(1.5)), KeyPart::from(&json!(1.5)));
    }

    #[test]
    fn test_key_part_roundtrip_to_value() {
        let value = json!({"a": [1, "b", null, true, 2.5]});
        assert_eq!(KeyPart::from(&value).to_value(), value);
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(Identifier::from(7).to_string(), "7");
        assert_eq!(Identifier::from("u1").to_string(), "\"u1\"");
        let compound = Identifier::Compound(vec![KeyPart::Int(1), KeyPart::from("eu")]);
        assert_eq!(compound.to_string(), "[1, \"eu\"]");
    }

    #[test]
    fn test_is_scalar() {
        assert!(KeyPart::Int(1).is_scalar());
        assert!(KeyPart::from("x").is_scalar());
        assert!(!KeyPart::Null.is_scalar());
        assert!(!KeyPart::List(vec![]).is_scalar());
    }
}
