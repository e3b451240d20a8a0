//! Service registration, discovery and per-context instantiation.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::context::BundleContext;
use crate::domain::{
    ServiceClass, ServiceObject, ServiceProperties, ServiceReference, ServiceRegistration,
    ServiceSource,
};
use crate::registry::{ServiceEvent, ServiceListener};

impl BundleContext {
    /// Register a capability under `class`, owned by this context, and fire
    /// `service:registered`.
    pub fn register_service(
        &self,
        class: impl Into<ServiceClass>,
        source: ServiceSource,
        properties: ServiceProperties,
    ) -> ServiceRegistration {
        let reference = self
            .shared
            .services
            .register(class.into(), self.id, source, properties);

        info!(
            class = %reference.class(),
            service_index = reference.service_index(),
            context = %self.id,
            factory = reference.is_factory(),
            "Service registered"
        );
        self.shared
            .listeners
            .fire(ServiceEvent::Registered, &reference);

        ServiceRegistration::new(reference, Arc::downgrade(&self.shared))
    }

    /// Live references under `class` whose attributes contain every entry of
    /// `filter`, in registration order.
    #[must_use]
    pub fn get_service_references(
        &self,
        class: impl Into<ServiceClass>,
        filter: &ServiceProperties,
    ) -> Vec<Arc<ServiceReference>> {
        self.shared.services.references(&class.into(), filter)
    }

    /// The service object for `reference`, scoped to this context.
    ///
    /// The first call from this context instantiates it (invoking the
    /// factory with `args`, or taking the shared value) and caches it; later
    /// calls return the cached object until [`unget_service`]. Returns
    /// `None` for an unregistered reference or a removed context.
    ///
    /// [`unget_service`]: Self::unget_service
    pub fn get_service(&self, reference: &ServiceReference, args: &[Value]) -> Option<ServiceObject> {
        if !reference.is_registered() {
            debug!(class = %reference.class(), service_index = reference.service_index(), "Service no longer registered");
            return None;
        }

        let key = reference.key();
        let cached = self.shared.tree.read().cached(self.id, &key);
        if cached.is_some() {
            return cached;
        }

        // No lock held: factories may call back into the framework.
        let instance = reference.instantiate(self, args);

        let mut tree = self.shared.tree.write();
        if !reference.is_registered() {
            return None;
        }
        match tree.cache_insert(self.id, key, instance) {
            Some((instance, true)) => {
                reference.acquire();
                debug!(
                    class = %reference.class(),
                    service_index = reference.service_index(),
                    context = %self.id,
                    usage = reference.usage(),
                    "Service instantiated"
                );
                Some(instance)
            }
            Some((instance, false)) => Some(instance),
            None => {
                debug!(context = %self.id, "Context removed, service not cached");
                None
            }
        }
    }

    /// Typed [`get_service`](Self::get_service).
    pub fn get_service_as<T: Any + Send + Sync>(
        &self,
        reference: &ServiceReference,
        args: &[Value],
    ) -> Option<Arc<T>> {
        self.get_service(reference, args)?.downcast::<T>().ok()
    }

    /// Drop this context's cached instance of `reference`. Returns `false`
    /// when nothing was cached.
    pub fn unget_service(&self, reference: &ServiceReference) -> bool {
        let removed = self
            .shared
            .tree
            .write()
            .cache_remove(self.id, &reference.key());
        if removed.is_some() {
            reference.release();
            true
        } else {
            false
        }
    }

    pub fn add_service_listener(&self, event: ServiceEvent, listener: ServiceListener) {
        self.shared.listeners.add(event, listener);
    }

    pub fn remove_service_listener(&self, event: ServiceEvent, listener: &ServiceListener) -> bool {
        self.shared.listeners.remove(event, listener)
    }
}
