#![forbid(unsafe_code)]

//! Explicit type-tag registry.
//!
//! A [`Registry`] maps a type tag to a constructor. It is populated at
//! startup by whoever assembles the application (see
//! [`builtin`](crate::builtin) for the stock set) and injected into a
//! [`Factory`](crate::Factory); nothing is discovered at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use splom_core::{Descriptor, ParamError, ParseError};

use crate::overlay::{CellBinding, Overlay};
use crate::strategy::RenderStrategy;

/// Builds an instance of `T` from a parsed descriptor and a binding `A`.
pub type Constructor<T, A> =
    Arc<dyn Fn(&Descriptor, A) -> Result<Box<T>, BuildError> + Send + Sync>;

/// Registry of overlay types.
pub type OverlayRegistry = Registry<dyn Overlay, CellBinding>;

/// Registry of render-strategy types.
pub type StrategyRegistry = Registry<dyn RenderStrategy, ()>;

/// A canonical string could not be turned into an instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no type registered under {0:?}")]
    UnknownKind(String),
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Type tag → constructor map.
pub struct Registry<T: ?Sized, A> {
    entries: BTreeMap<String, Constructor<T, A>>,
}

impl<T: ?Sized, A> Registry<T, A> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Descriptor, A) -> Result<Box<T>, BuildError> + Send + Sync + 'static,
    {
        self.entries.insert(kind.into(), Arc::new(constructor));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, kind: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Descriptor, A) -> Result<Box<T>, BuildError> + Send + Sync + 'static,
    {
        self.register(kind, constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered type tags in ascending order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `canonical` and run the matching constructor.
    pub fn build(&self, canonical: &str, binding: A) -> Result<Box<T>, BuildError> {
        let descriptor = Descriptor::parse(canonical)?;
        let constructor = self
            .entries
            .get(descriptor.kind())
            .ok_or_else(|| BuildError::UnknownKind(descriptor.kind().to_string()))?;
        constructor(&descriptor, binding)
    }
}

impl<T: ?Sized, A> Default for Registry<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, A> Clone for Registry<T, A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized, A> fmt::Debug for Registry<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
