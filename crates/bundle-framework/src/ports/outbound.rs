//! Outbound port: resolving bundle identifiers to code.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BundleExports, BundleId};
use crate::error::LoadError;
use crate::ports::Activator;

/// What a module loader yields for a bundle identifier.
#[derive(Clone, Default)]
pub struct LoadedModule {
    /// Exported symbols handed back to `install_bundle` callers.
    pub exports: BundleExports,
    /// Activators started when the bundle's context is activated.
    pub activators: Vec<Arc<dyn Activator>>,
}

impl LoadedModule {
    #[must_use]
    pub fn new(exports: BundleExports) -> Self {
        Self {
            exports,
            activators: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_activator(mut self, activator: Arc<dyn Activator>) -> Self {
        self.activators.push(activator);
        self
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("exports", &self.exports)
            .field(
                "activators",
                &self.activators.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Fetches and evaluates bundle code.
///
/// The framework guarantees at most one in-flight `load` per identifier.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Resolve `bundle` to its exports and activators.
    async fn load(&self, bundle: &BundleId) -> Result<LoadedModule, LoadError>;

    /// Drop a previously resolved identifier. Best effort: a failure is
    /// logged by the framework and never fails the removal.
    async fn unload(&self, bundle: &BundleId) -> Result<(), LoadError>;
}
