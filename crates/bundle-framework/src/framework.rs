//! # Framework
//!
//! The process-scoped state object: bundle table, service registry,
//! listener registry and context arena, handed to the root context at
//! startup instead of living in ambient globals.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use crate::bridge::{CommandBridge, CommandSender};
use crate::config::{duration_millis, FrameworkConfig};
use crate::context::{BundleContext, ContextId, ContextTree};
use crate::domain::{Bundle, BundleId, BundleState, ServiceClass, ServiceReference};
use crate::error::{ConfigError, LoadError};
use crate::ports::{Activator, LoadedModule, ModuleLoader};
use crate::registry::{BundleTable, ListenerRegistry, ServiceEvent, ServiceRegistry};

pub(crate) struct FrameworkShared {
    pub(crate) config: FrameworkConfig,
    pub(crate) loader: Arc<dyn ModuleLoader>,
    pub(crate) bundles: Mutex<BundleTable>,
    pub(crate) services: ServiceRegistry,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) tree: RwLock<ContextTree>,
    pub(crate) load_cancel: Notify,
}

impl FrameworkShared {
    /// Load through the module loader, bounded by the configured timeout and
    /// abandoned when [`Framework::cancel_pending_loads`] fires.
    pub(crate) async fn load_module(&self, id: &BundleId) -> Result<LoadedModule, LoadError> {
        let load = async {
            match self.config.load_timeout {
                None => self.loader.load(id).await,
                Some(limit) => tokio::time::timeout(limit, self.loader.load(id))
                    .await
                    .unwrap_or_else(|_| {
                        Err(LoadError::TimedOut {
                            bundle: id.clone(),
                            after_ms: duration_millis(limit),
                        })
                    }),
            }
        };

        tokio::select! {
            result = load => result,
            () = self.load_cancel.notified() => Err(LoadError::Cancelled(id.clone())),
        }
    }

    /// Remove a registration, release every cached instance of it and fire
    /// `service:unregistered`.
    pub(crate) fn unregister_service(&self, reference: &Arc<ServiceReference>) -> bool {
        if !self.services.unregister(reference) {
            return false;
        }

        let purged = self.tree.write().purge(&reference.key());
        for _ in 0..purged {
            reference.release();
        }

        info!(
            class = %reference.class(),
            service_index = reference.service_index(),
            released = purged,
            "Service unregistered"
        );
        self.listeners.fire(ServiceEvent::Unregistered, reference);
        true
    }
}

/// Owner of all framework state. Cheap to clone.
#[derive(Clone)]
pub struct Framework {
    shared: Arc<FrameworkShared>,
}

impl Framework {
    pub fn new(
        config: FrameworkConfig,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Self, ConfigError> {
        Self::with_root_activators(config, loader, Vec::new())
    }

    /// Create a framework whose root context owns `activators`. They are
    /// started by `root().activate()`.
    pub fn with_root_activators(
        config: FrameworkConfig,
        loader: Arc<dyn ModuleLoader>,
        activators: Vec<Arc<dyn Activator>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            removal_policy = config.removal_policy.as_str(),
            load_timeout_ms = config.load_timeout.map(duration_millis),
            "Creating bundle framework"
        );

        Ok(Self {
            shared: Arc::new(FrameworkShared {
                config,
                loader,
                bundles: Mutex::new(BundleTable::default()),
                services: ServiceRegistry::new(),
                listeners: ListenerRegistry::new(),
                tree: RwLock::new(ContextTree::new(activators)),
                load_cancel: Notify::new(),
            }),
        })
    }

    /// The root context.
    #[must_use]
    pub fn root(&self) -> BundleContext {
        BundleContext::new(ContextId::ROOT, Arc::clone(&self.shared))
    }

    /// Handle to any live context.
    #[must_use]
    pub fn context(&self, id: ContextId) -> Option<BundleContext> {
        self.shared
            .tree
            .read()
            .contains(id)
            .then(|| BundleContext::new(id, Arc::clone(&self.shared)))
    }

    #[must_use]
    pub fn config(&self) -> &FrameworkConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn bundle(&self, id: impl Into<BundleId>) -> Option<Arc<Bundle>> {
        self.shared.bundles.lock().get(&id.into())
    }

    #[must_use]
    pub fn bundle_state(&self, id: impl Into<BundleId>) -> BundleState {
        self.shared.bundles.lock().state(&id.into())
    }

    /// Installed identifiers, sorted.
    #[must_use]
    pub fn installed_bundles(&self) -> Vec<BundleId> {
        self.shared.bundles.lock().ids()
    }

    #[must_use]
    pub fn bundle_count(&self) -> usize {
        self.shared.bundles.lock().len()
    }

    /// Live registrations under `class`.
    #[must_use]
    pub fn service_count(&self, class: impl Into<ServiceClass>) -> usize {
        self.shared.services.count(&class.into())
    }

    #[must_use]
    pub fn service_class_count(&self) -> usize {
        self.shared.services.class_count()
    }

    /// Number of contexts in the arena, root included.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.shared.tree.read().len()
    }

    /// Fail every module load currently in flight with
    /// [`LoadError::Cancelled`]. Loads started afterwards are unaffected.
    pub fn cancel_pending_loads(&self) {
        info!("Cancelling in-flight module loads");
        self.shared.load_cancel.notify_waiters();
    }

    /// Wire the root context to a command inlet and run the bridge on the
    /// current tokio runtime until `shutdown` flips or every sender drops.
    pub fn spawn_command_bridge(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> (CommandSender, JoinHandle<()>) {
        let (sender, bridge) = CommandBridge::new(self);
        let handle = tokio::spawn(bridge.run(shutdown));
        (sender, handle)
    }
}
