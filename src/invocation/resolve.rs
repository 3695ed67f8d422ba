//! Key and Identifier Resolution
//!
//! Turns call arguments into compound keys and domain objects into pool
//! identifiers.

use serde_json::Value;

use crate::cache::{CompoundKey, Identifier, KeyPart};
use crate::error::{MnemoError, Result};
use crate::invocation::{FieldLookup, KeySource, FALLBACK_ID_FIELDS};

// == Build Key ==
/// Key over the key-bearing arguments, in index order as declared.
///
/// No declared indices means every argument is key-bearing.
pub fn build_key(args: &[Value], key_indices: &[usize]) -> Result<CompoundKey> {
    if key_indices.is_empty() {
        return Ok(CompoundKey::from_values(args));
    }
    let values = key_indices
        .iter()
        .map(|&index| argument(args, index))
        .collect::<Result<Vec<&Value>>>()?;
    Ok(CompoundKey::from_values(values))
}

/// Positions of the key-bearing arguments.
pub fn key_positions(args: &[Value], key_indices: &[usize]) -> Vec<usize> {
    if key_indices.is_empty() {
        (0..args.len()).collect()
    } else {
        key_indices.to_vec()
    }
}

pub(crate) fn argument(args: &[Value], index: usize) -> Result<&Value> {
    args.get(index).ok_or_else(|| {
        MnemoError::Configuration(format!(
            "argument index {} out of range for {} arguments",
            index,
            args.len()
        ))
    })
}

// == Derive Identifier ==
/// Identifier of one domain object.
///
/// Numbers and text are their own identifier. Objects use the declared id
/// fields (several make a compound identifier), else the first conventional
/// id field present.
pub fn derive_identifier(
    value: &Value,
    id_fields: &[String],
    lookup: &dyn FieldLookup,
) -> Result<Identifier> {
    let part = KeyPart::from(value);
    if part.is_scalar() {
        return Ok(Identifier::Single(part));
    }

    match id_fields {
        [] => FALLBACK_ID_FIELDS
            .iter()
            .find_map(|name| lookup.lookup(value, name).ok())
            .map(|id| Identifier::Single(KeyPart::from(&id)))
            .ok_or_else(|| {
                MnemoError::field("id", "no declared id field and no conventional id field")
            }),
        [field] => Ok(Identifier::Single(KeyPart::from(&lookup.lookup(value, field)?))),
        fields => {
            let parts = fields
                .iter()
                .map(|field| lookup.lookup(value, field).map(|v| KeyPart::from(&v)))
                .collect::<Result<Vec<KeyPart>>>()?;
            Ok(Identifier::Compound(parts))
        }
    }
}

/// Identifier → element pairs of a value, in element order.
///
/// A sequence maps each element; anything else is a one-element mapping.
pub fn derive_identifiers(
    value: &Value,
    id_fields: &[String],
    lookup: &dyn FieldLookup,
) -> Result<Vec<(Identifier, Value)>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| Ok((derive_identifier(item, id_fields, lookup)?, item.clone())))
            .collect(),
        other => Ok(vec![(
            derive_identifier(other, id_fields, lookup)?,
            other.clone(),
        )]),
    }
}

// == Resolve Update Key ==
/// Key of an update rule from its sources.
///
/// Sources with explicit positions are ordered by position, otherwise by
/// declaration. Mixing argument and updated-value sources requires every
/// source to carry a position.
pub fn resolve_update_key(
    sources: &[KeySource],
    args: &[Value],
    updated: Option<&Value>,
    lookup: &dyn FieldLookup,
) -> Result<CompoundKey> {
    let from_args = sources
        .iter()
        .any(|s| matches!(s, KeySource::Argument { .. }));
    let from_updated = sources
        .iter()
        .any(|s| matches!(s, KeySource::UpdatedField { .. }));
    let all_positioned = sources.iter().all(|s| s.position().is_some());

    if from_args && from_updated && !all_positioned {
        return Err(MnemoError::AmbiguousKeyOrder(
            "key mixes argument and updated-value sources without explicit positions"
                .to_string(),
        ));
    }

    let mut ordered: Vec<&KeySource> = sources.iter().collect();
    if all_positioned {
        ordered.sort_by_key(|s| s.position());
    }

    let parts = ordered
        .into_iter()
        .map(|source| match source {
            KeySource::Argument { index, .. } => Ok(KeyPart::from(argument(args, *index)?)),
            KeySource::UpdatedField { name, .. } => {
                let updated =
                    updated.ok_or_else(|| MnemoError::field(name.clone(), "no updated value"))?;
                Ok(KeyPart::from(&lookup.lookup(updated, name)?))
            }
        })
        .collect::<Result<Vec<KeyPart>>>()?;

    Ok(CompoundKey::new(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::JsonFieldLookup;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_key_all_args() {
        let args = vec![json!(1), json!("x")];
        assert_eq!(
            build_key(&args, &[]).unwrap(),
            CompoundKey::new(vec![KeyPart::Int(1), "x".into()])
        );
        assert_eq!(build_key(&[], &[]).unwrap(), CompoundKey::empty());
    }

    #[test]
    fn test_build_key_declared_indices() {
        let args = vec![json!(1), json!("x"), json!(true)];
        assert_eq!(
            build_key(&args, &[2, 0]).unwrap(),
            CompoundKey::from_values([&json!(true), &json!(1)])
        );
        assert!(matches!(
            build_key(&args, &[5]),
            Err(MnemoError::Configuration(_))
        ));
    }

    #[test]
    fn test_scalar_is_own_identifier() {
        let id = derive_identifier(&json!(42), &[], &JsonFieldLookup).unwrap();
        assert_eq!(id, Identifier::from(42));
        let id = derive_identifier(&json!("ada"), &fields(&["id"]), &JsonFieldLookup).unwrap();
        assert_eq!(id, Identifier::from("ada"));
    }

    #[test]
    fn test_declared_and_compound_fields() {
        let row = json!({"tenant": "acme", "user": 7, "name": "ada"});
        let single = derive_identifier(&row, &fields(&["user"]), &JsonFieldLookup).unwrap();
        assert_eq!(single, Identifier::from(7));

        let compound =
            derive_identifier(&row, &fields(&["tenant", "user"]), &JsonFieldLookup).unwrap();
        assert_eq!(
            compound,
            Identifier::Compound(vec!["acme".into(), KeyPart::Int(7)])
        );
    }

    #[test]
    fn test_fallback_id_fields() {
        let id = derive_identifier(&json!({"ID": 3}), &[], &JsonFieldLookup).unwrap();
        assert_eq!(id, Identifier::from(3));
        let id = derive_identifier(&json!({"_id": "x1"}), &[], &JsonFieldLookup).unwrap();
        assert_eq!(id, Identifier::from("x1"));
    }

    #[test]
    fn test_no_usable_field_is_error() {
        let result = derive_identifier(&json!({"name": "ada"}), &[], &JsonFieldLookup);
        assert!(matches!(result, Err(MnemoError::FieldResolution { .. })));

        let result = derive_identifier(&json!({"id": 1}), &fields(&["uuid"]), &JsonFieldLookup);
        assert!(matches!(result, Err(MnemoError::FieldResolution { .. })));
    }

    #[test]
    fn test_sequence_maps_each_element() {
        let users = json!([{"id": 1}, {"id": 2}]);
        let pairs = derive_identifiers(&users, &[], &JsonFieldLookup).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], (Identifier::from(2), json!({"id": 2})));
    }

    #[test]
    fn test_update_key_declaration_order() {
        let args = vec![json!("acme"), json!(7)];
        let key = resolve_update_key(
            &[KeySource::argument(1), KeySource::argument(0)],
            &args,
            None,
            &JsonFieldLookup,
        )
        .unwrap();
        assert_eq!(key, CompoundKey::new(vec![KeyPart::Int(7), "acme".into()]));
    }

    #[test]
    fn test_update_key_mixed_sources() {
        let args = vec![json!("acme")];
        let updated = json!({"team": "core"});

        let ambiguous = resolve_update_key(
            &[KeySource::argument(0), KeySource::updated_field("team")],
            &args,
            Some(&updated),
            &JsonFieldLookup,
        );
        assert!(matches!(ambiguous, Err(MnemoError::AmbiguousKeyOrder(_))));

        let key = resolve_update_key(
            &[
                KeySource::argument(0).at(1),
                KeySource::updated_field("team").at(0),
            ],
            &args,
            Some(&updated),
            &JsonFieldLookup,
        )
        .unwrap();
        assert_eq!(key, CompoundKey::new(vec!["core".into(), "acme".into()]));
    }

    #[test]
    fn test_update_key_needs_updated_value() {
        let result = resolve_update_key(
            &[KeySource::updated_field("team")],
            &[],
            None,
            &JsonFieldLookup,
        );
        assert!(matches!(result, Err(MnemoError::FieldResolution { .. })));
    }
}
