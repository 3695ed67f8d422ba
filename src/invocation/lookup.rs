//! Field Lookup Module
//!
//! Reads named fields out of domain objects for identifier derivation,
//! update keys and condition evaluation.

use serde_json::Value;

use crate::error::{MnemoError, Result};

/// Conventional id field names tried when no id field is declared.
pub const FALLBACK_ID_FIELDS: [&str; 4] = ["id", "Id", "ID", "_id"];

// == Field Lookup ==
/// Access to a named field of an object.
pub trait FieldLookup: Send + Sync {
    fn lookup(&self, object: &Value, field: &str) -> Result<Value>;
}

// == JSON Field Lookup ==
/// Default lookup over JSON objects.
///
/// Tries the member `name` first, then the accessor spellings `getName`,
/// `get_name`, `isName` and `is_name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFieldLookup;

impl JsonFieldLookup {
    fn candidates(field: &str) -> Vec<String> {
        let mut chars = field.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        vec![
            field.to_string(),
            format!("get{}", capitalized),
            format!("get_{}", field),
            format!("is{}", capitalized),
            format!("is_{}", field),
        ]
    }
}

impl FieldLookup for JsonFieldLookup {
    fn lookup(&self, object: &Value, field: &str) -> Result<Value> {
        let Value::Object(members) = object else {
            return Err(MnemoError::field(field, "value is not an object"));
        };
        if field.is_empty() {
            return Err(MnemoError::field(field, "empty field name"));
        }

        Self::candidates(field)
            .iter()
            .find_map(|name| members.get(name))
            .cloned()
            .ok_or_else(|| MnemoError::field(field, "no such field or accessor"))
    }
}
