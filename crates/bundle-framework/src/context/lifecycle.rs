//! Install, remove, activate and deactivate.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::RemovalPolicy;
use crate::context::{BundleContext, ContextId};
use crate::domain::{Bundle, BundleExports, BundleId};
use crate::error::{ActivatorError, BundleError};
use crate::framework::FrameworkShared;
use crate::ports::LoadedModule;

impl BundleContext {
    /// Install `bundle` as a child of this context.
    ///
    /// Idempotent: an identifier whose module is loaded (even while its
    /// activators are still starting) resolves immediately to the existing
    /// context and exports without touching the loader, and a concurrent
    /// call for an identifier still loading joins the in-flight install
    /// instead of starting a second load.
    pub async fn install_bundle(
        &self,
        bundle: impl Into<BundleId>,
    ) -> Result<(BundleContext, BundleExports), BundleError> {
        let id = bundle.into();

        let pending = {
            // A recorded bundle wins over its in-flight install: activators
            // that re-enter for a bundle still starting must not await it.
            let mut bundles = self.shared.bundles.lock();
            if let Some(installed) = bundles.get(&id) {
                debug!(bundle = %id, "Bundle already installed");
                return Ok((
                    self.sibling(installed.context_id()),
                    installed.exports().clone(),
                ));
            } else if let Some(pending) = bundles.pending(&id) {
                debug!(bundle = %id, "Install already in flight, joining");
                pending
            } else {
                let pending = install(Arc::clone(&self.shared), self.id, id.clone())
                    .boxed()
                    .shared();
                bundles.begin_install(id.clone(), pending.clone());
                pending
            }
        };

        let installed = pending.await?;
        Ok((
            self.sibling(installed.context_id()),
            installed.exports().clone(),
        ))
    }

    /// Stop and forget the bundle installed under `bundle`.
    ///
    /// Removing an identifier that is not installed completes successfully
    /// without touching any table.
    pub async fn remove_bundle(&self, bundle: impl Into<BundleId>) -> Result<(), BundleError> {
        remove(Arc::clone(&self.shared), bundle.into()).await
    }

    /// Run `start` on every activator in registration order. The first
    /// failure stops the walk and is returned.
    pub async fn activate(&self) -> Result<(), ActivatorError> {
        let activators = self.shared.tree.read().activators(self.id);
        for activator in activators {
            debug!(context = %self.id, activator = activator.name(), "Starting activator");
            activator.start(self).await?;
        }
        Ok(())
    }

    /// Run `stop` on every activator in registration order.
    pub async fn deactivate(&self) -> Result<(), ActivatorError> {
        let activators = self.shared.tree.read().activators(self.id);
        for activator in activators {
            debug!(context = %self.id, activator = activator.name(), "Stopping activator");
            activator.stop(self).await?;
        }
        Ok(())
    }
}

async fn install(
    shared: Arc<FrameworkShared>,
    parent: ContextId,
    id: BundleId,
) -> Result<Arc<Bundle>, BundleError> {
    info!(bundle = %id, parent = %parent, "Installing bundle");

    let module = match shared.load_module(&id).await {
        Ok(module) => module,
        Err(source) => {
            shared.bundles.lock().abandon_install(&id);
            warn!(bundle = %id, error = %source, "Bundle load failed");
            return Err(BundleError::Load { bundle: id, source });
        }
    };

    let LoadedModule {
        exports,
        activators,
    } = module;
    let context_id = shared
        .tree
        .write()
        .insert_child(parent, id.clone(), activators);
    let bundle = Arc::new(Bundle::new(id.clone(), context_id, exports));
    shared.bundles.lock().insert_installing(Arc::clone(&bundle));

    let context = BundleContext::new(context_id, Arc::clone(&shared));
    let started = context.activate().await;
    shared.bundles.lock().finish_install(&id);

    match started {
        Ok(()) => {
            info!(bundle = %id, context = %context_id, "Bundle active");
            Ok(bundle)
        }
        Err(source) => {
            error!(bundle = %id, error = %source, "Bundle activation failed, not rolled back");
            Err(BundleError::Start { bundle: id, source })
        }
    }
}

fn remove(shared: Arc<FrameworkShared>, id: BundleId) -> BoxFuture<'static, Result<(), BundleError>> {
    async move {
        let claimed = shared.bundles.lock().begin_remove(&id);
        let Some(bundle) = claimed else {
            debug!(bundle = %id, "Bundle not installed, nothing to remove");
            return Ok(());
        };

        let context_id = bundle.context_id();
        let context = BundleContext::new(context_id, Arc::clone(&shared));
        let policy = shared.config.removal_policy;
        info!(bundle = %id, policy = policy.as_str(), "Removing bundle");

        if policy == RemovalPolicy::Cascade {
            for (child, _) in context.children() {
                if let Err(err) = remove(Arc::clone(&shared), child).await {
                    shared.bundles.lock().abort_remove(&id);
                    return Err(err);
                }
            }
        }

        if let Err(source) = context.deactivate().await {
            shared.bundles.lock().abort_remove(&id);
            error!(bundle = %id, error = %source, "Bundle deactivation failed, removal aborted");
            return Err(BundleError::Stop { bundle: id, source });
        }

        if let Err(err) = shared.loader.unload(&id).await {
            warn!(bundle = %id, error = %err, "Module unload failed, continuing removal");
        }

        let detached = shared.tree.write().detach(context_id);
        if let Some(node) = detached {
            for key in node.into_instance_keys() {
                if let Some(reference) = shared.services.lookup(&key) {
                    reference.release();
                }
            }
        }
        shared.bundles.lock().remove(&id);

        if policy == RemovalPolicy::Cascade {
            for reference in shared.services.owned_by(&[context_id]) {
                shared.unregister_service(&reference);
            }
        }

        info!(bundle = %id, "Bundle uninstalled");
        Ok(())
    }
    .boxed()
}
