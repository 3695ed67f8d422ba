//! Method Descriptor Module
//!
//! Already-parsed declarative configuration of a method: which cache its
//! results live in, how its key is built, and which update rules it fires.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::CacheParameters;

// == Invoker ==
/// The underlying computation of a method.
///
/// `Ok(None)` and `Ok(Some(Value::Null))` both mean "no result" and are never
/// cached.
pub trait Invoker: Send + Sync {
    fn invoke(&self, args: &[Value]) -> anyhow::Result<Option<Value>>;
}

impl<F> Invoker for F
where
    F: Fn(&[Value]) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> anyhow::Result<Option<Value>> {
        self(args)
    }
}

/// Wraps a closure as a shared invoker.
pub fn invoker_fn<F>(f: F) -> Arc<dyn Invoker>
where
    F: Fn(&[Value]) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(f)
}

// == Cacheable Spec ==
/// Where and how a method's results are cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheableSpec {
    pub cache_name: String,
    /// Key-bearing argument positions; empty means every argument
    pub key_indices: Vec<usize>,
    /// Declared id fields of the result objects
    pub id_fields: Vec<String>,
    pub parameters: CacheParameters,
}

impl CacheableSpec {
    pub fn new(cache_name: impl Into<String>, parameters: CacheParameters) -> Self {
        Self {
            cache_name: cache_name.into(),
            key_indices: Vec::new(),
            id_fields: Vec::new(),
            parameters,
        }
    }

    pub fn key_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.key_indices = indices.into_iter().collect();
        self
    }

    pub fn id_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.id_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

// == Update Modes ==
/// What an update rule removes from its target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveMode {
    #[default]
    None,
    /// Drop the whole key
    RemoveKey,
    /// Drop one identifier from the collection at the key
    RemoveFromOneCollection,
    /// Drop one identifier from every collection
    RemoveFromAllCollections,
    /// Clear the store
    InvalidateAll,
}

/// What an update rule adds to its target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    #[default]
    None,
    /// Drop the key, then store the value under it
    ReplaceAtKey,
    /// Merge the value into the collection at the key, loading it first if absent
    AddToCollection,
    /// Merge the value into every collection
    AddToAllCollections,
    /// Drop the key, then store the value as the whole collection
    ReplaceCollection,
}

/// How multiple condition names combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionMode {
    #[default]
    All,
    Any,
}

// == Key Source ==
/// One component of an update rule's key.
///
/// `position` orders components explicitly; it is required whenever a rule
/// mixes argument and updated-value sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Argument { index: usize, position: Option<usize> },
    UpdatedField { name: String, position: Option<usize> },
}

impl KeySource {
    pub fn argument(index: usize) -> Self {
        KeySource::Argument {
            index,
            position: None,
        }
    }

    pub fn updated_field(name: impl Into<String>) -> Self {
        KeySource::UpdatedField {
            name: name.into(),
            position: None,
        }
    }

    /// Sets the explicit position of this component.
    pub fn at(self, position: usize) -> Self {
        match self {
            KeySource::Argument { index, .. } => KeySource::Argument {
                index,
                position: Some(position),
            },
            KeySource::UpdatedField { name, .. } => KeySource::UpdatedField {
                name,
                position: Some(position),
            },
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            KeySource::Argument { position, .. } | KeySource::UpdatedField { position, .. } => {
                *position
            }
        }
    }
}

// == Update Rule ==
/// One add/remove step against a named store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateRule {
    pub cache_name: String,
    pub remove: RemoveMode,
    pub add: AddMode,
    pub key_sources: Vec<KeySource>,
    /// Argument holding the value to add or remove; defaults to the updated value
    pub value_argument: Option<usize>,
    pub id_fields: Vec<String>,
    /// Condition names, `!` prefix negates
    pub conditions: Vec<String>,
    pub condition_mode: ConditionMode,
}

impl UpdateRule {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            ..Self::default()
        }
    }

    pub fn remove(mut self, mode: RemoveMode) -> Self {
        self.remove = mode;
        self
    }

    pub fn add(mut self, mode: AddMode) -> Self {
        self.add = mode;
        self
    }

    pub fn key(mut self, source: KeySource) -> Self {
        self.key_sources.push(source);
        self
    }

    pub fn value_argument(mut self, index: usize) -> Self {
        self.value_argument = Some(index);
        self
    }

    pub fn id_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.id_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn condition(mut self, name: impl Into<String>) -> Self {
        self.conditions.push(name.into());
        self
    }

    pub fn any_condition(mut self) -> Self {
        self.condition_mode = ConditionMode::Any;
        self
    }
}

// == Method Descriptor ==
/// Identity and cache configuration of one method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodDescriptor {
    pub name: String,
    pub arg_names: Vec<String>,
    pub cacheable: Option<CacheableSpec>,
    pub updates: Vec<UpdateRule>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn arg_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.arg_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn cacheable(mut self, spec: CacheableSpec) -> Self {
        self.cacheable = Some(spec);
        self
    }

    pub fn update(mut self, rule: UpdateRule) -> Self {
        self.updates.push(rule);
        self
    }

    /// Position of a named argument.
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.arg_names.iter().position(|arg| arg == name)
    }
}

// == Method Invocation Context ==
/// One call: what is being called, how to run it, and with which arguments.
#[derive(Clone)]
pub struct MethodInvocationContext {
    pub descriptor: Arc<MethodDescriptor>,
    pub invoker: Arc<dyn Invoker>,
    pub args: Vec<Value>,
}

impl MethodInvocationContext {
    pub fn new(
        descriptor: Arc<MethodDescriptor>,
        invoker: Arc<dyn Invoker>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            descriptor,
            invoker,
            args,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.descriptor.name
    }
}

impl fmt::Debug for MethodInvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocationContext")
            .field("method", &self.descriptor.name)
            .field("args", &self.args)
            .finish()
    }
}
