//! # Listener Registry
//!
//! Event → observers, invoked in registration order. The same observer may be
//! added more than once; removal drops the first matching entry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::ServiceReference;

/// Events fired by the service registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceEvent {
    Registered,
    Unregistered,
}

impl ServiceEvent {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "service:registered",
            Self::Unregistered => "service:unregistered",
        }
    }
}

impl fmt::Display for ServiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service:registered" => Ok(Self::Registered),
            "service:unregistered" => Ok(Self::Unregistered),
            other => Err(format!("unknown service event '{other}'")),
        }
    }
}

/// Observer of service events. Identity is the `Arc` allocation.
pub type ServiceListener = Arc<dyn Fn(&Arc<ServiceReference>) + Send + Sync>;

/// Wrap a closure as a [`ServiceListener`].
pub fn listener<F>(f: F) -> ServiceListener
where
    F: Fn(&Arc<ServiceReference>) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_listener(a: &ServiceListener, b: &ServiceListener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

/// Process-wide listener registry.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<ServiceEvent, Vec<ServiceListener>>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, event: ServiceEvent, listener: ServiceListener) {
        self.listeners.write().entry(event).or_default().push(listener);
    }

    /// Remove the first registration of `listener` for `event`.
    pub fn remove(&self, event: ServiceEvent, listener: &ServiceListener) -> bool {
        let mut listeners = self.listeners.write();
        let Some(observers) = listeners.get_mut(&event) else {
            return false;
        };
        match observers.iter().position(|l| same_listener(l, listener)) {
            Some(idx) => {
                observers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Invoke every observer of `event` in registration order. Observers run
    /// against a snapshot with no lock held, so they may add or remove
    /// listeners themselves.
    pub fn fire(&self, event: ServiceEvent, reference: &Arc<ServiceReference>) -> usize {
        let observers: Vec<ServiceListener> = self
            .listeners
            .read()
            .get(&event)
            .cloned()
            .unwrap_or_default();

        debug!(
            event = %event,
            class = %reference.class(),
            service_index = reference.service_index(),
            observers = observers.len(),
            "Firing service event"
        );

        for observer in &observers {
            observer(reference);
        }
        observers.len()
    }

    pub fn count(&self, event: ServiceEvent) -> usize {
        self.listeners.read().get(&event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextId;
    use crate::domain::{ServiceClass, ServiceProperties, ServiceSource};
    use parking_lot::Mutex;

    fn reference() -> Arc<ServiceReference> {
        Arc::new(ServiceReference::new(
            ServiceClass::from("card"),
            1,
            ContextId::ROOT,
            ServiceSource::value(()),
            ServiceProperties::new(),
        ))
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> ServiceListener {
        let log = Arc::clone(log);
        listener(move |_| log.lock().push(name))
    }

    #[test]
    fn test_fire_in_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(ServiceEvent::Registered, recorder(&log, "l1"));
        registry.add(ServiceEvent::Registered, recorder(&log, "l2"));

        assert_eq!(registry.fire(ServiceEvent::Registered, &reference()), 2);
        assert_eq!(*log.lock(), vec!["l1", "l2"]);
    }

    #[test]
    fn test_removed_listener_not_invoked() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = recorder(&log, "l1");
        registry.add(ServiceEvent::Registered, Arc::clone(&l1));
        registry.add(ServiceEvent::Registered, recorder(&log, "l2"));

        assert!(registry.remove(ServiceEvent::Registered, &l1));
        registry.fire(ServiceEvent::Registered, &reference());
        assert_eq!(*log.lock(), vec!["l2"]);
    }

    #[test]
    fn test_remove_drops_first_duplicate_only() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = recorder(&log, "l1");
        registry.add(ServiceEvent::Unregistered, Arc::clone(&l1));
        registry.add(ServiceEvent::Unregistered, Arc::clone(&l1));

        assert!(registry.remove(ServiceEvent::Unregistered, &l1));
        assert_eq!(registry.count(ServiceEvent::Unregistered), 1);
        registry.fire(ServiceEvent::Unregistered, &reference());
        assert_eq!(*log.lock(), vec!["l1"]);
    }

    #[test]
    fn test_events_are_independent() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = recorder(&log, "l1");
        registry.add(ServiceEvent::Registered, Arc::clone(&l1));

        assert!(!registry.remove(ServiceEvent::Unregistered, &l1));
        assert_eq!(registry.fire(ServiceEvent::Unregistered, &reference()), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_listener_may_mutate_registry_while_firing() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = Arc::clone(&registry);
        registry.add(
            ServiceEvent::Registered,
            listener(move |_| inner.add(ServiceEvent::Registered, listener(|_| {}))),
        );

        registry.fire(ServiceEvent::Registered, &reference());
        assert_eq!(registry.count(ServiceEvent::Registered), 2);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ServiceEvent::Registered.as_str(), "service:registered");
        assert_eq!(
            "service:unregistered".parse::<ServiceEvent>().unwrap(),
            ServiceEvent::Unregistered
        );
        assert!("service:modified".parse::<ServiceEvent>().is_err());
    }
}
