//! # Bundle Contexts
//!
//! A `BundleContext` is a cheap handle (arena key + shared framework state)
//! naming one node of the context tree: the root, or one per installed
//! bundle. Every consumer-facing operation is issued through a context.

mod lifecycle;
mod services;
mod tree;

use std::fmt;
use std::sync::Arc;

pub use tree::ContextId;
pub(crate) use tree::ContextTree;

use crate::domain::BundleId;
use crate::framework::FrameworkShared;

/// Handle to a node of the context tree.
#[derive(Clone)]
pub struct BundleContext {
    id: ContextId,
    shared: Arc<FrameworkShared>,
}

impl BundleContext {
    pub(crate) fn new(id: ContextId, shared: Arc<FrameworkShared>) -> Self {
        Self { id, shared }
    }

    /// Handle to another node of the same framework.
    fn sibling(&self, id: ContextId) -> Self {
        Self::new(id, Arc::clone(&self.shared))
    }

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == ContextId::ROOT
    }

    /// `false` once the owning bundle has been removed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.tree.read().contains(self.id)
    }

    /// Identifier of the bundle owning this context (`None` for the root).
    #[must_use]
    pub fn bundle_id(&self) -> Option<BundleId> {
        self.shared.tree.read().bundle(self.id)
    }

    /// The parent context, if it is still part of the tree.
    #[must_use]
    pub fn parent(&self) -> Option<BundleContext> {
        let tree = self.shared.tree.read();
        tree.parent(self.id)
            .filter(|parent| tree.contains(*parent))
            .map(|parent| self.sibling(parent))
    }

    /// Child bundles installed through this context, ordered by identifier.
    #[must_use]
    pub fn children(&self) -> Vec<(BundleId, BundleContext)> {
        let children = self.shared.tree.read().children(self.id);
        children
            .into_iter()
            .map(|(bundle, child)| (bundle, self.sibling(child)))
            .collect()
    }

    /// Number of service instances cached for this context.
    #[must_use]
    pub fn cached_instance_count(&self) -> usize {
        self.shared.tree.read().cached_count(self.id)
    }
}

impl PartialEq for BundleContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for BundleContext {}

impl fmt::Debug for BundleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleContext")
            .field("id", &self.id)
            .field("bundle", &self.bundle_id())
            .finish()
    }
}
