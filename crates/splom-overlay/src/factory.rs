#![forbid(unsafe_code)]

//! Factories with the failure-to-default policy.
//!
//! A [`Factory`] wraps a [`Registry`] and an infallible fallback
//! constructor. [`Factory::instantiate`] never fails: when the registry
//! cannot build the requested canonical string it logs a warning on the
//! `splom.factory` target, bumps [`fallbacks_total`], and returns the
//! fallback instance instead. One misconfigured annotation must not abort
//! the whole visualization.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use splom_core::Descriptor;

use crate::builtin;
use crate::overlay::{CellBinding, Overlay};
use crate::registry::{BuildError, Registry};
use crate::strategy::RenderStrategy;

static FALLBACKS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total fallback instantiations across all factories (monotonic counter).
#[must_use]
pub fn fallbacks_total() -> u64 {
    FALLBACKS_TOTAL.load(Ordering::Relaxed)
}

/// Builds the documented default instance.
pub type Fallback<T, A> = Arc<dyn Fn(A) -> Box<T> + Send + Sync>;

/// Overlay factory: canonical string + cell binding → overlay instance.
pub type OverlayFactory = Factory<dyn Overlay, CellBinding>;

/// Render-strategy factory: canonical string → strategy instance.
pub type StrategyFactory = Factory<dyn RenderStrategy, ()>;

/// A registry plus a fallback.
pub struct Factory<T: ?Sized, A> {
    label: &'static str,
    registry: Registry<T, A>,
    fallback_kind: String,
    fallback: Fallback<T, A>,
}

impl<T: ?Sized, A: Clone> Factory<T, A> {
    /// Create a factory.
    ///
    /// `label` names the factory in logs; `fallback_kind` documents which
    /// type the fallback produces.
    pub fn new<F>(
        label: &'static str,
        registry: Registry<T, A>,
        fallback_kind: impl Into<String>,
        fallback: F,
    ) -> Self
    where
        F: Fn(A) -> Box<T> + Send + Sync + 'static,
    {
        Self {
            label,
            registry,
            fallback_kind: fallback_kind.into(),
            fallback: Arc::new(fallback),
        }
    }

    pub fn registry(&self) -> &Registry<T, A> {
        &self.registry
    }

    /// Type tag of the fallback instance.
    pub fn fallback_kind(&self) -> &str {
        &self.fallback_kind
    }

    /// Fall back to the registry's own type for `canonical` instead of the
    /// current fallback.
    ///
    /// `canonical` must parse and name a registered type, otherwise the
    /// factory is left unchanged. If building it still fails for a given
    /// binding, the previous fallback is used.
    pub fn set_fallback(&mut self, canonical: &str) -> Result<(), BuildError>
    where
        T: 'static,
        A: 'static,
    {
        let descriptor = Descriptor::parse(canonical)?;
        if !self.registry.contains(descriptor.kind()) {
            return Err(BuildError::UnknownKind(descriptor.kind().to_string()));
        }
        let canonical = descriptor.canonical();
        let registry = self.registry.clone();
        let previous = Arc::clone(&self.fallback);
        let label = self.label;
        let key = canonical.clone();
        self.fallback = Arc::new(move |binding: A| match registry.build(&key, binding.clone()) {
            Ok(instance) => instance,
            Err(err) => {
                tracing::warn!(
                    target: "splom.factory",
                    factory = label,
                    fallback = %key,
                    error = %err,
                    "fallback could not be built, using the stock default"
                );
                previous(binding)
            }
        });
        self.fallback_kind = descriptor.kind().to_string();
        tracing::debug!(target: "splom.factory", factory = self.label, fallback = %canonical, "fallback replaced");
        Ok(())
    }

    /// Build without the fallback, surfacing the reconstruction error.
    pub fn try_instantiate(&self, canonical: &str, binding: A) -> Result<Box<T>, BuildError> {
        self.registry.build(canonical, binding)
    }

    /// Build an instance, substituting the fallback on any reconstruction
    /// failure.
    pub fn instantiate(&self, canonical: &str, binding: A) -> Box<T> {
        match self.registry.build(canonical, binding.clone()) {
            Ok(instance) => instance,
            Err(err) => {
                FALLBACKS_TOTAL.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "splom.factory",
                    factory = self.label,
                    canonical = %canonical,
                    fallback = %self.fallback_kind,
                    error = %err,
                    "reconstruction failed, falling back to default"
                );
                (self.fallback)(binding)
            }
        }
    }
}

impl OverlayFactory {
    /// Built-in overlay types; unknown or malformed strings become a
    /// default `diagonal`.
    pub fn builtin() -> Self {
        Self::with_registry(builtin::overlay_registry())
    }

    /// Custom registry with the stock `diagonal` fallback.
    pub fn with_registry(registry: Registry<dyn Overlay, CellBinding>) -> Self {
        Self::new(
            "overlay",
            registry,
            builtin::DIAGONAL,
            builtin::Diagonal::fallback,
        )
    }
}

impl StrategyFactory {
    /// Built-in render strategies; unknown or malformed strings become a
    /// default `circle`.
    pub fn builtin() -> Self {
        Self::with_registry(builtin::strategy_registry())
    }

    /// Custom registry with the stock `circle` fallback.
    pub fn with_registry(registry: Registry<dyn RenderStrategy, ()>) -> Self {
        Self::new("strategy", registry, builtin::CIRCLE, |()| {
            Box::new(builtin::PointStrategy::circle())
        })
    }

    /// Build a strategy for `canonical`.
    pub fn create(&self, canonical: &str) -> Box<dyn RenderStrategy> {
        self.instantiate(canonical, ())
    }
}

impl<T: ?Sized, A> fmt::Debug for Factory<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("label", &self.label)
            .field("registry", &self.registry)
            .field("fallback_kind", &self.fallback_kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use splom_core::{Dataset, DatasetView, Size};
    use tracing_test::traced_test;

    fn binding() -> CellBinding {
        let data = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![0.0, 1.0, 2.0], vec![0.0, 2.0, 4.0]],
        )
        .unwrap();
        CellBinding {
            cell: CellId::new(1, 0),
            view: Arc::new(DatasetView::full(Arc::new(data))),
            size: Size::square(100),
        }
    }

    #[test]
    fn known_kind_builds_requested_type() {
        let f = OverlayFactory::builtin();
        let o = f.instantiate("lowess:window=120", binding());
        assert_eq!(o.kind(), "lowess");
        assert_eq!(o.descriptor().canonical(), "lowess:window=120");
    }

    #[test]
    #[traced_test]
    fn unknown_kind_falls_back_to_diagonal() {
        let f = OverlayFactory::builtin();
        let before = fallbacks_total();
        let o = f.instantiate("not-a-real-overlay-type:x=1", binding());
        assert_eq!(o.kind(), "diagonal");
        assert!(fallbacks_total() > before);
        assert!(logs_contain("reconstruction failed, falling back to default"));
        assert!(logs_contain("not-a-real-overlay-type"));
    }

    #[test]
    fn malformed_parameters_fall_back() {
        let f = OverlayFactory::builtin();
        assert_eq!(f.instantiate("lowess:window=many", binding()).kind(), "diagonal");
        assert_eq!(f.instantiate("lowess:window=1", binding()).kind(), "diagonal");
        assert_eq!(f.instantiate("diagonal:thickness", binding()).kind(), "diagonal");
        assert_eq!(f.instantiate("", binding()).kind(), "diagonal");
    }

    #[test]
    fn try_instantiate_surfaces_the_error() {
        let f = OverlayFactory::builtin();
        let err = f.try_instantiate("nope", binding()).unwrap_err();
        assert_eq!(err, BuildError::UnknownKind("nope".into()));
    }

    #[test]
    fn empty_registry_always_falls_back() {
        let f = OverlayFactory::with_registry(Registry::new());
        assert_eq!(f.instantiate("diagonal", binding()).kind(), "diagonal");
        assert_eq!(f.fallback_kind(), "diagonal");
    }

    #[test]
    fn set_fallback_uses_the_registered_type() {
        let mut f = OverlayFactory::builtin();
        f.set_fallback("lowess:window=5").unwrap();
        assert_eq!(f.fallback_kind(), "lowess");
        let o = f.instantiate("nope", binding());
        assert_eq!(o.kind(), "lowess");
        assert_eq!(o.descriptor().canonical(), "lowess:window=5");
    }

    #[test]
    fn set_fallback_rejects_unknown_types() {
        let mut f = StrategyFactory::builtin();
        assert_eq!(
            f.set_fallback("hexagon"),
            Err(BuildError::UnknownKind("hexagon".into()))
        );
        assert!(matches!(f.set_fallback("cross:"), Err(BuildError::Parse(_))));
        assert_eq!(f.fallback_kind(), "circle");
        assert_eq!(f.create("hexagon").kind(), "circle");
    }

    #[test]
    fn unbuildable_fallback_chains_to_the_stock_one() {
        let mut f = StrategyFactory::builtin();
        f.set_fallback("square:side=0").unwrap();
        assert_eq!(f.create("hexagon").kind(), "circle");
    }

    #[test]
    fn strategy_factory_falls_back_to_circle() {
        let f = StrategyFactory::builtin();
        assert_eq!(f.create("square:side=4").kind(), "square");
        assert_eq!(f.create("hexagon").kind(), "circle");
        assert_eq!(f.create("square:side=zero").kind(), "circle");
    }
}
