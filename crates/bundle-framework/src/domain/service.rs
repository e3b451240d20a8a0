//! Service references and the tagged value-or-factory they bind.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{BundleContext, ContextId};
use crate::domain::ServiceProperties;
use crate::framework::FrameworkShared;

/// An instantiated service object as handed to consumers.
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Produces one service object per consuming context.
pub type ServiceFactory = Arc<dyn Fn(&BundleContext, &[Value]) -> ServiceObject + Send + Sync>;

/// Capability class identifier: the key services are grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceClass(String);

impl ServiceClass {
    pub fn new(class: impl Into<String>) -> Self {
        Self(class.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceClass {
    fn from(class: &str) -> Self {
        Self(class.to_string())
    }
}

impl From<String> for ServiceClass {
    fn from(class: String) -> Self {
        Self(class)
    }
}

impl From<&ServiceClass> for ServiceClass {
    fn from(class: &ServiceClass) -> Self {
        class.clone()
    }
}

/// Cache key of an instantiated service: (class, service index).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub class: ServiceClass,
    pub index: u64,
}

/// What a registration binds, decided once at registration time.
#[derive(Clone)]
pub enum ServiceSource {
    /// Shared by every consumer.
    Value(ServiceObject),
    /// Invoked once per consuming context.
    Factory(ServiceFactory),
}

impl ServiceSource {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&BundleContext, &[Value]) -> T + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |context, args| {
            Arc::new(factory(context, args)) as ServiceObject
        }))
    }

    #[must_use]
    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Factory(_))
    }
}

impl fmt::Debug for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// One registration of a capability.
pub struct ServiceReference {
    class: ServiceClass,
    index: u64,
    owner: ContextId,
    source: ServiceSource,
    properties: ServiceProperties,
    usage: AtomicUsize,
    registered: AtomicBool,
}

impl ServiceReference {
    pub(crate) fn new(
        class: ServiceClass,
        index: u64,
        owner: ContextId,
        source: ServiceSource,
        properties: ServiceProperties,
    ) -> Self {
        Self {
            class,
            index,
            owner,
            source,
            properties,
            usage: AtomicUsize::new(0),
            registered: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn class(&self) -> &ServiceClass {
        &self.class
    }

    /// Per-class index; strictly increasing, never reused.
    #[must_use]
    pub fn service_index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn key(&self) -> ServiceKey {
        ServiceKey {
            class: self.class.clone(),
            index: self.index,
        }
    }

    /// Context that registered the service.
    #[must_use]
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    #[must_use]
    pub fn properties(&self) -> &ServiceProperties {
        &self.properties
    }

    /// Number of consuming contexts currently holding a cached instance.
    #[must_use]
    pub fn usage(&self) -> usize {
        self.usage.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_factory(&self) -> bool {
        self.source.is_factory()
    }

    #[must_use]
    pub fn matches(&self, filter: &ServiceProperties) -> bool {
        self.properties.matches(filter)
    }

    /// Obtain the service object scoped to `context`'s cache.
    pub fn get_service(&self, context: &BundleContext, args: &[Value]) -> Option<ServiceObject> {
        context.get_service(self, args)
    }

    pub(crate) fn instantiate(&self, context: &BundleContext, args: &[Value]) -> ServiceObject {
        match &self.source {
            ServiceSource::Value(value) => Arc::clone(value),
            ServiceSource::Factory(factory) => factory(context, args),
        }
    }

    pub(crate) fn acquire(&self) {
        self.usage.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        let _ = self
            .usage
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Returns `false` if it was already marked.
    pub(crate) fn mark_unregistered(&self) -> bool {
        self.registered.swap(false, Ordering::SeqCst)
    }
}

impl fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceReference")
            .field("class", &self.class)
            .field("index", &self.index)
            .field("owner", &self.owner)
            .field("source", &self.source)
            .field("properties", &self.properties)
            .field("usage", &self.usage())
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Returned by `register_service`: the capability to unregister, plus
/// read access to the reference it controls.
pub struct ServiceRegistration {
    reference: Arc<ServiceReference>,
    framework: Weak<FrameworkShared>,
}

impl ServiceRegistration {
    pub(crate) fn new(reference: Arc<ServiceReference>, framework: Weak<FrameworkShared>) -> Self {
        Self {
            reference,
            framework,
        }
    }

    #[must_use]
    pub fn reference(&self) -> &Arc<ServiceReference> {
        &self.reference
    }

    /// Remove the registration from the global registry and fire
    /// `service:unregistered`. Returns `false` if it was already gone.
    pub fn unregister(&self) -> bool {
        match self.framework.upgrade() {
            Some(shared) => shared.unregister_service(&self.reference),
            None => self.reference.mark_unregistered(),
        }
    }
}

impl Deref for ServiceRegistration {
    type Target = ServiceReference;

    fn deref(&self) -> &Self::Target {
        &self.reference
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceRegistration")
            .field(&self.reference)
            .finish()
    }
}
