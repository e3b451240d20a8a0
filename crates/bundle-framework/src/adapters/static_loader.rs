//! In-memory module loader.
//!
//! Bundles are defined up front as closures producing a [`LoadedModule`].
//! Used by the runtime's built-in catalog and throughout the tests, where
//! the optional latency makes concurrent installs observable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::BundleId;
use crate::error::LoadError;
use crate::ports::{LoadedModule, ModuleLoader};

/// Produces the module for a bundle identifier on every load.
pub type ModuleFactory = Arc<dyn Fn(&BundleId) -> Result<LoadedModule, LoadError> + Send + Sync>;

#[derive(Default)]
pub struct StaticModuleLoader {
    catalog: RwLock<HashMap<BundleId, ModuleFactory>>,
    loaded: RwLock<HashSet<BundleId>>,
    load_counts: RwLock<HashMap<BundleId, usize>>,
    latency: Option<Duration>,
}

impl StaticModuleLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `load` by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Define `bundle` as the module built by `factory`.
    pub fn define<F>(&self, bundle: impl Into<BundleId>, factory: F)
    where
        F: Fn() -> LoadedModule + Send + Sync + 'static,
    {
        self.define_with(bundle, move |_| Ok(factory()));
    }

    /// Define `bundle` with a fallible factory.
    pub fn define_with<F>(&self, bundle: impl Into<BundleId>, factory: F)
    where
        F: Fn(&BundleId) -> Result<LoadedModule, LoadError> + Send + Sync + 'static,
    {
        self.catalog.write().insert(bundle.into(), Arc::new(factory));
    }

    /// Define `bundle` as a module whose evaluation always fails.
    pub fn define_failing(&self, bundle: impl Into<BundleId>, reason: impl Into<String>) {
        let reason = reason.into();
        self.define_with(bundle, move |id| {
            Err(LoadError::Failed {
                bundle: id.clone(),
                reason: reason.clone(),
            })
        });
    }

    pub fn undefine(&self, bundle: &BundleId) -> bool {
        self.catalog.write().remove(bundle).is_some()
    }

    #[must_use]
    pub fn is_defined(&self, bundle: &BundleId) -> bool {
        self.catalog.read().contains_key(bundle)
    }

    #[must_use]
    pub fn is_loaded(&self, bundle: &BundleId) -> bool {
        self.loaded.read().contains(bundle)
    }

    /// How many times `load` was invoked for `bundle`, failures included.
    #[must_use]
    pub fn load_count(&self, bundle: &BundleId) -> usize {
        self.load_counts.read().get(bundle).copied().unwrap_or(0)
    }

    /// Currently loaded identifiers, sorted.
    #[must_use]
    pub fn loaded(&self) -> Vec<BundleId> {
        let mut ids: Vec<BundleId> = self.loaded.read().iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, bundle: &BundleId) -> Result<LoadedModule, LoadError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        *self.load_counts.write().entry(bundle.clone()).or_insert(0) += 1;

        let factory = self.catalog.read().get(bundle).cloned();
        let Some(factory) = factory else {
            debug!(bundle = %bundle, "No module defined");
            return Err(LoadError::NotFound(bundle.clone()));
        };

        let module = factory(bundle)?;
        self.loaded.write().insert(bundle.clone());
        debug!(bundle = %bundle, activators = module.activators.len(), "Module loaded");
        Ok(module)
    }

    async fn unload(&self, bundle: &BundleId) -> Result<(), LoadError> {
        if self.loaded.write().remove(bundle) {
            debug!(bundle = %bundle, "Module unloaded");
            Ok(())
        } else {
            Err(LoadError::NotFound(bundle.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BundleExports;

    #[tokio::test]
    async fn test_load_defined_module() {
        let loader = StaticModuleLoader::new();
        loader.define("/webapp/a", || {
            LoadedModule::new(BundleExports::new().with("answer", 42u32))
        });

        let id = BundleId::from("/webapp/a");
        let module = loader.load(&id).await.unwrap();
        assert_eq!(module.exports.get::<u32>("answer").as_deref(), Some(&42));
        assert!(loader.is_loaded(&id));
        assert_eq!(loader.load_count(&id), 1);
    }

    #[tokio::test]
    async fn test_load_undefined_module() {
        let loader = StaticModuleLoader::new();
        let id = BundleId::from("/webapp/missing");
        assert_eq!(
            loader.load(&id).await.unwrap_err(),
            LoadError::NotFound(id.clone())
        );
        assert_eq!(loader.load_count(&id), 1);
        assert!(!loader.is_loaded(&id));
    }

    #[tokio::test]
    async fn test_failing_module() {
        let loader = StaticModuleLoader::new();
        loader.define_failing("/webapp/broken", "syntax error");

        let err = loader.load(&BundleId::from("/webapp/broken")).await.unwrap_err();
        assert!(matches!(err, LoadError::Failed { reason, .. } if reason == "syntax error"));
        assert!(loader.loaded().is_empty());
    }

    #[tokio::test]
    async fn test_unload() {
        let loader = StaticModuleLoader::new();
        loader.define("/webapp/a", LoadedModule::default);
        let id = BundleId::from("/webapp/a");

        assert!(loader.unload(&id).await.is_err());
        loader.load(&id).await.unwrap();
        assert!(loader.unload(&id).await.is_ok());
        assert!(!loader.is_loaded(&id));
    }

    #[test]
    fn test_undefine() {
        let loader = StaticModuleLoader::new();
        loader.define("/webapp/a", LoadedModule::default);
        let id = BundleId::from("/webapp/a");
        assert!(loader.is_defined(&id));
        assert!(loader.undefine(&id));
        assert!(!loader.is_defined(&id));
    }
}
