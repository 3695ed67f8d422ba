//! Cache Orchestrator
//!
//! Decides per invocation whether to serve from cache or run the
//! computation, and applies update rules to the named stores.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::cache::{
    CacheParameters, CacheRegistry, CompoundKey, EntryIds, EvictionStore, Identifier, ValuePool,
};
use crate::error::{MnemoError, Result};
use crate::invocation::{
    argument, build_key, derive_identifier, derive_identifiers, key_positions,
    resolve_update_key, AddMode, CacheableSpec, FieldLookup, Invoker, JsonFieldLookup,
    MethodDescriptor, MethodInvocationContext, RemoveMode, UpdateRule,
};
use crate::proxy::evaluate_conditions;

// == Loader ==
/// The cacheable method last seen for a cache, used to load a collection
/// before adding to it.
#[derive(Clone)]
struct Loader {
    descriptor: Arc<MethodDescriptor>,
    invoker: Arc<dyn Invoker>,
}

// == Cache Orchestrator ==
/// Get-or-populate and update-rule engine over a [`CacheRegistry`].
///
/// Operations on the same key are not serialized beyond what the stores
/// provide: two concurrent misses may both run the computation, and the
/// last write wins.
pub struct CacheOrchestrator {
    registry: Arc<CacheRegistry>,
    lookup: Arc<dyn FieldLookup>,
    loaders: DashMap<String, Loader>,
}

impl fmt::Debug for CacheOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOrchestrator")
            .field("registry", &self.registry)
            .field(
                "loaders",
                &self.loaders.iter().map(|e| e.key().clone()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CacheOrchestrator {
    // == Constructor ==
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self::with_lookup(registry, Arc::new(JsonFieldLookup))
    }

    /// Creates an orchestrator reading fields through a custom lookup.
    pub fn with_lookup(registry: Arc<CacheRegistry>, lookup: Arc<dyn FieldLookup>) -> Self {
        Self {
            registry,
            lookup,
            loaders: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    fn pool(&self) -> &ValuePool {
        self.registry.pool()
    }

    /// Creates a named cache in the underlying registry.
    pub fn create_cache(
        &self,
        name: &str,
        params: CacheParameters,
    ) -> Result<Arc<dyn EvictionStore>> {
        self.registry.create_cache(name, params)
    }

    // == Register Method ==
    /// Creates the cache of a cacheable method and remembers it as the
    /// loader of that cache.
    pub fn register_method(
        &self,
        descriptor: Arc<MethodDescriptor>,
        invoker: Arc<dyn Invoker>,
    ) -> Result<()> {
        if let Some(spec) = &descriptor.cacheable {
            self.registry
                .create_cache(&spec.cache_name, spec.parameters.clone())?;
            self.loaders
                .insert(spec.cache_name.clone(), Loader { descriptor, invoker });
        }
        Ok(())
    }

    // == Get Or Populate ==
    /// Serves a cacheable call from its store, running the computation on a miss.
    ///
    /// Methods without a cacheable spec are invoked directly.
    pub fn get_or_populate(&self, ctx: &MethodInvocationContext) -> Result<Option<Value>> {
        let Some(spec) = &ctx.descriptor.cacheable else {
            return invoke(&ctx.descriptor.name, ctx.invoker.as_ref(), &ctx.args);
        };

        let store = match self.registry.get(&spec.cache_name) {
            Some(store) => store,
            None => self
                .registry
                .create_cache(&spec.cache_name, spec.parameters.clone())?,
        };
        self.loaders
            .entry(spec.cache_name.clone())
            .or_insert_with(|| Loader {
                descriptor: Arc::clone(&ctx.descriptor),
                invoker: Arc::clone(&ctx.invoker),
            });

        if store.parameters().handle_collection_keys_separately {
            match collection_argument(&ctx.args, spec) {
                Some(position) => return self.populate_separately(ctx, spec, store.as_ref(), position),
                None => debug!(
                    "'{}' has no collection-valued key argument; using shared handling",
                    ctx.descriptor.name
                ),
            }
        }

        let key = build_key(&ctx.args, &spec.key_indices)?;
        if let Some(cached) = store.get(&key).and_then(|ids| self.resolve_pooled(ids)) {
            debug!("Cache hit in '{}' for key {}", spec.cache_name, key);
            return Ok(Some(cached));
        }

        debug!("Cache miss in '{}' for key {}", spec.cache_name, key);
        let Some(result) = invoke(&ctx.descriptor.name, ctx.invoker.as_ref(), &ctx.args)? else {
            return Ok(None);
        };
        self.store_result(store.as_ref(), key, &result, &spec.id_fields)?;
        Ok(Some(result))
    }

    /// Pooled values of an entry; any pool miss makes the whole entry a miss.
    fn resolve_pooled(&self, ids: EntryIds) -> Option<Value> {
        match ids {
            EntryIds::Single(id) => self.pool().get(&id),
            EntryIds::Collection(ids) => {
                let values = self.pool().get_all(&ids);
                (values.len() == ids.len()).then_some(Value::Array(values))
            }
        }
    }

    // == Store Result ==
    /// Pools a result and records it under a key.
    ///
    /// Each value is registered before the store references it and the
    /// registration is dropped afterwards, so the store's own reference is
    /// what keeps it pooled.
    fn store_result(
        &self,
        store: &dyn EvictionStore,
        key: CompoundKey,
        result: &Value,
        id_fields: &[String],
    ) -> Result<()> {
        let pool = self.pool();
        if store.parameters().returns_collection {
            let pairs = derive_identifiers(result, id_fields, self.lookup.as_ref())?;
            for (id, value) in &pairs {
                pool.put(id.clone(), value.clone(), true);
            }
            store.put(
                key,
                EntryIds::collection(pairs.iter().map(|(id, _)| id.clone())),
            );
            pool.release_many(pairs.iter().map(|(id, _)| id));
        } else {
            let id = derive_identifier(result, id_fields, self.lookup.as_ref())?;
            pool.put(id.clone(), result.clone(), true);
            store.put(key, EntryIds::Single(id.clone()));
            pool.release_one(&id);
        }
        Ok(())
    }

    // == Separate Handling ==
    /// Looks every element of the collection argument up under its own key
    /// and runs the computation only for the missing elements, in parallel.
    ///
    /// Results are combined in element order. An element whose computation
    /// yields nothing is left out.
    fn populate_separately(
        &self,
        ctx: &MethodInvocationContext,
        spec: &CacheableSpec,
        store: &dyn EvictionStore,
        position: usize,
    ) -> Result<Option<Value>> {
        let Some(Value::Array(elements)) = ctx.args.get(position) else {
            return Ok(None);
        };

        let element_keys = elements
            .iter()
            .map(|element| {
                let mut args = ctx.args.clone();
                args[position] = element.clone();
                build_key(&args, &spec.key_indices)
            })
            .collect::<Result<Vec<CompoundKey>>>()?;

        let mut hits: Vec<Option<Value>> = store
            .get_all(&element_keys)
            .into_iter()
            .map(|ids| ids.and_then(|ids| self.resolve_pooled(ids)))
            .collect();
        let missing: Vec<usize> = (0..elements.len()).filter(|&i| hits[i].is_none()).collect();
        debug!(
            "'{}': {} of {} elements cached",
            ctx.descriptor.name,
            elements.len() - missing.len(),
            elements.len()
        );

        let fresh: HashMap<usize, Option<Value>> = missing
            .into_par_iter()
            .map(|i| {
                let mut args = ctx.args.clone();
                args[position] = Value::Array(vec![elements[i].clone()]);
                invoke(&ctx.descriptor.name, ctx.invoker.as_ref(), &args).map(|result| (i, result))
            })
            .collect::<Result<Vec<(usize, Option<Value>)>>>()?
            .into_iter()
            .collect();

        let mut combined = Vec::new();
        for (i, key) in element_keys.into_iter().enumerate() {
            if let Some(hit) = hits[i].take() {
                append(&mut combined, hit);
                continue;
            }
            match fresh.get(&i).cloned().flatten() {
                Some(result) => {
                    self.store_result(store, key, &result, &spec.id_fields)?;
                    append(&mut combined, result);
                }
                None => trace!("Element {} yielded no result; omitted", key),
            }
        }

        Ok(Some(Value::Array(combined)))
    }

    // == Apply Update ==
    /// Applies every update rule of the invoked method.
    ///
    /// `updated` is the changed domain object, when the call produced or
    /// received one. Rules naming an unknown cache are skipped.
    pub fn apply_update(
        &self,
        ctx: &MethodInvocationContext,
        updated: Option<&Value>,
    ) -> Result<()> {
        for rule in &ctx.descriptor.updates {
            self.apply_rule(ctx, rule, updated)?;
        }
        Ok(())
    }

    /// Runs an update method, then applies its rules with the result as the
    /// updated value.
    pub fn invoke_and_update(&self, ctx: &MethodInvocationContext) -> Result<Option<Value>> {
        let result = invoke(&ctx.descriptor.name, ctx.invoker.as_ref(), &ctx.args)?;
        self.apply_update(ctx, result.as_ref())?;
        Ok(result)
    }

    fn apply_rule(
        &self,
        ctx: &MethodInvocationContext,
        rule: &UpdateRule,
        updated: Option<&Value>,
    ) -> Result<()> {
        let Some(store) = self.registry.get(&rule.cache_name) else {
            debug!(
                "Update target '{}' of '{}' does not exist; skipping",
                rule.cache_name, ctx.descriptor.name
            );
            return Ok(());
        };

        if !evaluate_conditions(rule, &ctx.descriptor, &ctx.args, updated, self.lookup.as_ref()) {
            debug!(
                "Conditions of '{}' rule on '{}' not met",
                ctx.descriptor.name, rule.cache_name
            );
            return Ok(());
        }

        let value = match rule.value_argument {
            Some(index) => Some(argument(&ctx.args, index)?),
            None => updated,
        }
        .filter(|value| !value.is_null());
        let key = || resolve_update_key(&rule.key_sources, &ctx.args, updated, self.lookup.as_ref());

        match rule.remove {
            RemoveMode::None => {}
            RemoveMode::RemoveKey => {
                store.remove(&key()?);
            }
            RemoveMode::RemoveFromOneCollection => {
                let key = key()?;
                for id in self.value_ids(rule, value)? {
                    store.remove_identifier_from_collection(Some(&key), &id);
                }
            }
            RemoveMode::RemoveFromAllCollections => {
                for id in self.value_ids(rule, value)? {
                    store.remove_identifier_from_collection(None, &id);
                }
            }
            RemoveMode::InvalidateAll => store.invalidate(),
        }

        match rule.add {
            AddMode::None => {}
            AddMode::ReplaceAtKey | AddMode::ReplaceCollection => {
                let key = key()?;
                store.remove(&key);
                match value {
                    Some(value) => self.store_result(store.as_ref(), key, value, &rule.id_fields)?,
                    None => warn!("'{}' rule on '{}' has no value to store", ctx.descriptor.name, rule.cache_name),
                }
            }
            AddMode::AddToCollection => {
                let key = key()?;
                let Some(value) = value else {
                    warn!("'{}' rule on '{}' has no value to add", ctx.descriptor.name, rule.cache_name);
                    return Ok(());
                };
                if !store.contains(&key) && !self.preload(&rule.cache_name, store.as_ref(), &key)? {
                    debug!(
                        "No collection loaded at {} in '{}'; skipping add",
                        key, rule.cache_name
                    );
                    return Ok(());
                }
                self.merge_values(store.as_ref(), Some(&key), value, &rule.id_fields)?;
            }
            AddMode::AddToAllCollections => match value {
                Some(value) => self.merge_values(store.as_ref(), None, value, &rule.id_fields)?,
                None => warn!("'{}' rule on '{}' has no value to add", ctx.descriptor.name, rule.cache_name),
            },
        }

        Ok(())
    }

    /// Identifiers of the value an update rule acts on.
    fn value_ids(&self, rule: &UpdateRule, value: Option<&Value>) -> Result<Vec<Identifier>> {
        let Some(value) = value else {
            warn!("Rule on '{}' has no value to remove", rule.cache_name);
            return Ok(Vec::new());
        };
        Ok(derive_identifiers(value, &rule.id_fields, self.lookup.as_ref())?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Pools the value(s) and unions their identifiers into one collection
    /// or, without a key, into every collection.
    fn merge_values(
        &self,
        store: &dyn EvictionStore,
        key: Option<&CompoundKey>,
        value: &Value,
        id_fields: &[String],
    ) -> Result<()> {
        let pairs = derive_identifiers(value, id_fields, self.lookup.as_ref())?;
        let pool = self.pool();
        for (id, value) in &pairs {
            pool.put(id.clone(), value.clone(), true);
        }
        let ids: Vec<Identifier> = pairs.into_iter().map(|(id, _)| id).collect();
        match key {
            Some(key) => store.merge(key, ids.clone()),
            None => {
                for id in &ids {
                    store.merge_into_all(id);
                }
            }
        }
        pool.release_many(ids.iter());
        Ok(())
    }

    // == Preload ==
    /// Loads the full collection at a key through the cache's loader.
    ///
    /// Returns false when no loader is known or it yields nothing.
    fn preload(&self, cache_name: &str, store: &dyn EvictionStore, key: &CompoundKey) -> Result<bool> {
        let Some(loader) = self.loaders.get(cache_name).map(|entry| entry.value().clone()) else {
            return Ok(false);
        };
        let Some(spec) = &loader.descriptor.cacheable else {
            return Ok(false);
        };

        let args = loader_args(&loader.descriptor, spec, key);
        debug!("Preloading {} in '{}' through '{}'", key, cache_name, loader.descriptor.name);
        let Some(result) = invoke(&loader.descriptor.name, loader.invoker.as_ref(), &args)? else {
            return Ok(false);
        };
        self.store_result(store, key.clone(), &result, &spec.id_fields)?;
        Ok(true)
    }
}

// == Helpers ==
/// Runs a computation; a null result counts as no result.
fn invoke(method: &str, invoker: &dyn Invoker, args: &[Value]) -> Result<Option<Value>> {
    let result = invoker
        .invoke(args)
        .map_err(|source| MnemoError::Invocation {
            method: method.to_string(),
            source,
        })?;
    Ok(result.filter(|value| !value.is_null()))
}

/// First key-bearing argument holding a sequence.
fn collection_argument(args: &[Value], spec: &CacheableSpec) -> Option<usize> {
    key_positions(args, &spec.key_indices)
        .into_iter()
        .find(|&i| matches!(args.get(i), Some(Value::Array(_))))
}

/// Arguments for a loader call that reproduces `key`.
///
/// Key components go back to their key-bearing positions; every other
/// argument is null.
fn loader_args(descriptor: &MethodDescriptor, spec: &CacheableSpec, key: &CompoundKey) -> Vec<Value> {
    let positions: Vec<usize> = if spec.key_indices.is_empty() {
        (0..key.parts().len()).collect()
    } else {
        spec.key_indices.clone()
    };
    let len = positions
        .iter()
        .map(|&p| p + 1)
        .max()
        .unwrap_or(0)
        .max(descriptor.arg_names.len());

    let mut args = vec![Value::Null; len];
    for (&position, part) in positions.iter().zip(key.parts()) {
        args[position] = part.to_value();
    }
    args
}

fn append(combined: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(items) => combined.extend(items),
        other => combined.push(other),
    }
}
