use crate::binding::aggregate::{Aggregate, Members};
use crate::binding::names::{join, validate_name};
use crate::dispatch::{Binding, Handler};
use crate::error::BindingError;
use crate::ipc::SessionContext;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Builds the bindings of one session from its context.
pub type Factory =
    Arc<dyn Fn(&SessionContext) -> Result<BindingSource, BindingError> + Send + Sync>;

/// Something that yields a set of named bindings.
///
/// Every constructor validates names up front, so a source that exists is
/// well-formed. [`BindingSource::names`] is always the exact key set that
/// [`BindingSource::materialize`] produces.
#[derive(Clone)]
pub struct BindingSource {
    kind: SourceKind,
}

#[derive(Clone)]
enum SourceKind {
    Function {
        name: String,
        binding: Binding,
    },
    Map(BTreeMap<String, Binding>),
    Aggregate {
        type_name: &'static str,
        members: BTreeMap<String, Binding>,
    },
    Prefixed {
        prefix: String,
        inner: Box<BindingSource>,
    },
    Deferred {
        names: BTreeSet<String>,
        factory: Factory,
    },
}

impl BindingSource {
    /// One function under one name.
    pub fn from_function<H, P>(name: impl Into<String>, handler: H) -> Result<Self, BindingError>
    where
        H: Handler<P>,
    {
        Self::from_binding(name, Binding::new(handler)?)
    }

    /// One prebuilt binding under one name.
    pub fn from_binding(name: impl Into<String>, binding: Binding) -> Result<Self, BindingError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            kind: SourceKind::Function { name, binding },
        })
    }

    /// A fixed set of named bindings.
    pub fn from_map<I, N>(entries: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (N, Binding)>,
        N: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, binding) in entries {
            let name = name.into();
            validate_name(&name)?;
            map.insert(name, binding);
        }
        if map.is_empty() {
            return Err(BindingError::empty_names("binding map is empty"));
        }
        Ok(Self {
            kind: SourceKind::Map(map),
        })
    }

    /// The exported members of `value`.
    pub fn from_aggregate<A: Aggregate>(value: Arc<A>) -> Result<Self, BindingError> {
        let type_name = value.type_name();
        let mut members = Members::new(type_name);
        value.export(&mut members);
        let members = members.finish()?;
        for name in members.keys() {
            validate_name(name)?;
        }
        Ok(Self {
            kind: SourceKind::Aggregate { type_name, members },
        })
    }

    /// The same bindings, each announced as `prefix.name`.
    pub fn with_prefix(self, prefix: impl Into<String>) -> Result<Self, BindingError> {
        let prefix = prefix.into();
        validate_name(&prefix)?;
        Ok(Self {
            kind: SourceKind::Prefixed {
                prefix,
                inner: Box::new(self),
            },
        })
    }

    /// Bindings built per session by `factory`, which must produce exactly
    /// `names`.
    pub fn deferred<I, N, F>(names: I, factory: F) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
        F: Fn(&SessionContext) -> Result<BindingSource, BindingError> + Send + Sync + 'static,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(BindingError::empty_names("deferred source declares no names"));
        }
        for name in &names {
            validate_name(name)?;
        }
        Ok(Self {
            kind: SourceKind::Deferred {
                names,
                factory: Arc::new(factory),
            },
        })
    }

    /// Like [`BindingSource::deferred`], taking the names from `prototype`.
    pub fn deferred_like<F>(prototype: &BindingSource, factory: F) -> Result<Self, BindingError>
    where
        F: Fn(&SessionContext) -> Result<BindingSource, BindingError> + Send + Sync + 'static,
    {
        Self::deferred(prototype.names(), factory)
    }

    /// Sorted names this source yields.
    pub fn names(&self) -> Vec<String> {
        match &self.kind {
            SourceKind::Function { name, .. } => vec![name.clone()],
            SourceKind::Map(map) => map.keys().cloned().collect(),
            SourceKind::Aggregate { members, .. } => members.keys().cloned().collect(),
            SourceKind::Prefixed { prefix, inner } => inner
                .names()
                .iter()
                .map(|name| join(prefix, name))
                .collect(),
            SourceKind::Deferred { names, .. } => names.iter().cloned().collect(),
        }
    }

    /// The bindings for the session described by `context`.
    pub fn materialize(
        &self,
        context: &SessionContext,
    ) -> Result<BTreeMap<String, Binding>, BindingError> {
        match &self.kind {
            SourceKind::Function { name, binding } => {
                Ok(BTreeMap::from([(name.clone(), binding.clone())]))
            }
            SourceKind::Map(map) => Ok(map.clone()),
            SourceKind::Aggregate { members, .. } => Ok(members.clone()),
            SourceKind::Prefixed { prefix, inner } => Ok(inner
                .materialize(context)?
                .into_iter()
                .map(|(name, binding)| (join(prefix, &name), binding))
                .collect()),
            SourceKind::Deferred { names, factory } => {
                let produced = factory(context)?.materialize(context)?;
                let missing: Vec<String> = names
                    .iter()
                    .filter(|name| !produced.contains_key(*name))
                    .cloned()
                    .collect();
                let unexpected: Vec<String> = produced
                    .keys()
                    .filter(|name| !names.contains(*name))
                    .cloned()
                    .collect();
                if !missing.is_empty() || !unexpected.is_empty() {
                    return Err(BindingError::deferred_mismatch(&missing, &unexpected));
                }
                Ok(produced)
            }
        }
    }
}

impl fmt::Debug for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SourceKind::Function { .. } => "function",
            SourceKind::Map(_) => "map",
            SourceKind::Aggregate { type_name, .. } => *type_name,
            SourceKind::Prefixed { .. } => "prefixed",
            SourceKind::Deferred { .. } => "deferred",
        };
        f.debug_struct("BindingSource")
            .field("kind", &kind)
            .field("names", &self.names())
            .finish()
    }
}
