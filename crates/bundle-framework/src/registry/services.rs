//! # Service Registry
//!
//! Capability class → ordered service references. Indexes are allocated per
//! class from a counter that only ever grows, so an index is never reused
//! even after its registration is removed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ContextId;
use crate::domain::{
    ServiceClass, ServiceKey, ServiceProperties, ServiceReference, ServiceSource, CLASS_PROPERTY,
};

#[derive(Default)]
struct ClassEntry {
    last_index: u64,
    references: BTreeMap<u64, Arc<ServiceReference>>,
}

/// Process-wide service registry.
#[derive(Default)]
pub struct ServiceRegistry {
    classes: RwLock<HashMap<ServiceClass, ClassEntry>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration under `class` with the next index for that class.
    ///
    /// The attribute bag always carries `cls = class`; a `cls` key in
    /// `properties` is overwritten.
    pub fn register(
        &self,
        class: ServiceClass,
        owner: ContextId,
        source: ServiceSource,
        mut properties: ServiceProperties,
    ) -> Arc<ServiceReference> {
        properties.insert(CLASS_PROPERTY, class.as_str());

        let mut classes = self.classes.write();
        let entry = classes.entry(class.clone()).or_default();
        entry.last_index += 1;
        let index = entry.last_index;

        let reference = Arc::new(ServiceReference::new(
            class, index, owner, source, properties,
        ));
        entry.references.insert(index, Arc::clone(&reference));
        reference
    }

    /// Remove a registration. Returns `false` if it was not (or no longer)
    /// registered.
    pub fn unregister(&self, reference: &ServiceReference) -> bool {
        let removed = {
            let mut classes = self.classes.write();
            classes
                .get_mut(reference.class())
                .and_then(|entry| entry.references.remove(&reference.service_index()))
                .is_some()
        };
        if removed {
            reference.mark_unregistered();
        }
        removed
    }

    /// Live references under `class` matching `filter`, in index order.
    /// Unknown classes yield an empty list.
    pub fn references(
        &self,
        class: &ServiceClass,
        filter: &ServiceProperties,
    ) -> Vec<Arc<ServiceReference>> {
        self.classes
            .read()
            .get(class)
            .map(|entry| {
                entry
                    .references
                    .values()
                    .filter(|reference| reference.matches(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn lookup(&self, key: &ServiceKey) -> Option<Arc<ServiceReference>> {
        self.classes
            .read()
            .get(&key.class)
            .and_then(|entry| entry.references.get(&key.index).cloned())
    }

    /// Every live reference registered by one of `owners`.
    pub fn owned_by(&self, owners: &[ContextId]) -> Vec<Arc<ServiceReference>> {
        let classes = self.classes.read();
        let mut owned: Vec<Arc<ServiceReference>> = classes
            .values()
            .flat_map(|entry| entry.references.values())
            .filter(|reference| owners.contains(&reference.owner()))
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            a.class()
                .cmp(b.class())
                .then(a.service_index().cmp(&b.service_index()))
        });
        owned
    }

    /// Number of live references under `class`.
    pub fn count(&self, class: &ServiceClass) -> usize {
        self.classes
            .read()
            .get(class)
            .map_or(0, |entry| entry.references.len())
    }

    /// Number of classes that ever had a registration.
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }
}
