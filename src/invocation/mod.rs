//! Invocation Module
//!
//! Boundary types supplied by whatever intercepts method calls: method
//! descriptors, the invoker of the underlying computation, field lookup,
//! and the key and identifier resolution built on them.

mod descriptor;
mod lookup;
mod resolve;

pub use descriptor::{
    invoker_fn, AddMode, CacheableSpec, ConditionMode, Invoker, KeySource, MethodDescriptor,
    MethodInvocationContext, RemoveMode, UpdateRule,
};
pub use lookup::{FieldLookup, JsonFieldLookup, FALLBACK_ID_FIELDS};
pub use resolve::{
    build_key, derive_identifier, derive_identifiers, key_positions, resolve_update_key,
};
pub(crate) use resolve::argument;
