//! Arena of context records.
//!
//! Parent links and child sets are stored as `ContextId` keys, so the tree
//! has no ownership cycles. Each node owns its activators and the service
//! instances it consumed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::domain::{BundleId, ServiceKey, ServiceObject};
use crate::ports::Activator;

/// Arena key of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// The root context, created with the framework.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ROOT {
            f.write_str("ctx-root")
        } else {
            write!(f, "ctx-{}", self.0)
        }
    }
}

pub(crate) struct ContextNode {
    parent: Option<ContextId>,
    bundle: Option<BundleId>,
    children: BTreeMap<BundleId, ContextId>,
    activators: Vec<Arc<dyn Activator>>,
    instances: HashMap<ServiceKey, ServiceObject>,
}

impl ContextNode {
    fn new(
        parent: Option<ContextId>,
        bundle: Option<BundleId>,
        activators: Vec<Arc<dyn Activator>>,
    ) -> Self {
        Self {
            parent,
            bundle,
            children: BTreeMap::new(),
            activators,
            instances: HashMap::new(),
        }
    }

    /// Keys of every service instance this context still held.
    pub fn into_instance_keys(self) -> Vec<ServiceKey> {
        self.instances.into_keys().collect()
    }
}

pub(crate) struct ContextTree {
    nodes: HashMap<ContextId, ContextNode>,
    next_id: u64,
}

impl ContextTree {
    pub fn new(root_activators: Vec<Arc<dyn Activator>>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ContextId::ROOT, ContextNode::new(None, None, root_activators));
        Self { nodes, next_id: 1 }
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn bundle(&self, id: ContextId) -> Option<BundleId> {
        self.nodes.get(&id).and_then(|node| node.bundle.clone())
    }

    pub fn children(&self, id: ContextId) -> Vec<(BundleId, ContextId)> {
        self.nodes
            .get(&id)
            .map(|node| {
                node.children
                    .iter()
                    .map(|(bundle, child)| (bundle.clone(), *child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn activators(&self, id: ContextId) -> Vec<Arc<dyn Activator>> {
        self.nodes
            .get(&id)
            .map(|node| node.activators.clone())
            .unwrap_or_default()
    }

    /// Create a context for `bundle` under `parent`. If the parent is gone
    /// the child is created unlinked.
    pub fn insert_child(
        &mut self,
        parent: ContextId,
        bundle: BundleId,
        activators: Vec<Arc<dyn Activator>>,
    ) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.insert(bundle.clone(), id);
        }
        self.nodes
            .insert(id, ContextNode::new(Some(parent), Some(bundle), activators));
        id
    }

    /// Remove a context and unlink it from its parent. Its own children are
    /// left in the arena untouched.
    pub fn detach(&mut self, id: ContextId) -> Option<ContextNode> {
        let node = self.nodes.remove(&id)?;
        if let (Some(parent), Some(bundle)) = (node.parent, node.bundle.as_ref()) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                if parent_node.children.get(bundle) == Some(&id) {
                    parent_node.children.remove(bundle);
                }
            }
        }
        Some(node)
    }

    pub fn cached(&self, id: ContextId, key: &ServiceKey) -> Option<ServiceObject> {
        self.nodes
            .get(&id)
            .and_then(|node| node.instances.get(key).cloned())
    }

    /// Cache `instance` unless the slot is already filled. Returns the
    /// instance now cached and whether this call filled the slot, or `None`
    /// if the context no longer exists.
    pub fn cache_insert(
        &mut self,
        id: ContextId,
        key: ServiceKey,
        instance: ServiceObject,
    ) -> Option<(ServiceObject, bool)> {
        let node = self.nodes.get_mut(&id)?;
        match node.instances.get(&key) {
            Some(existing) => Some((Arc::clone(existing), false)),
            None => {
                node.instances.insert(key, Arc::clone(&instance));
                Some((instance, true))
            }
        }
    }

    pub fn cache_remove(&mut self, id: ContextId, key: &ServiceKey) -> Option<ServiceObject> {
        self.nodes
            .get_mut(&id)
            .and_then(|node| node.instances.remove(key))
    }

    /// Drop `key` from every context's cache. Returns how many slots held it.
    pub fn purge(&mut self, key: &ServiceKey) -> usize {
        self.nodes
            .values_mut()
            .map(|node| node.instances.remove(key).is_some())
            .filter(|removed| *removed)
            .count()
    }

    pub fn cached_count(&self, id: ContextId) -> usize {
        self.nodes.get(&id).map_or(0, |node| node.instances.len())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
