//! Global bundle table with per-identifier in-flight install tracking.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};

use crate::domain::{Bundle, BundleId, BundleState};
use crate::error::BundleError;

/// An install every concurrent caller for the same identifier awaits.
pub(crate) type PendingInstall = Shared<BoxFuture<'static, Result<Arc<Bundle>, BundleError>>>;

struct BundleEntry {
    bundle: Arc<Bundle>,
    state: BundleState,
}

/// Installed bundles keyed by identifier. At most one live bundle per id.
#[derive(Default)]
pub(crate) struct BundleTable {
    entries: HashMap<BundleId, BundleEntry>,
    in_flight: HashMap<BundleId, PendingInstall>,
}

impl BundleTable {
    pub fn get(&self, id: &BundleId) -> Option<Arc<Bundle>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry.bundle))
    }

    pub fn state(&self, id: &BundleId) -> BundleState {
        if self.in_flight.contains_key(id) {
            return BundleState::Installing;
        }
        self.entries
            .get(id)
            .map_or(BundleState::Uninstalled, |entry| entry.state)
    }

    /// Installed identifiers, sorted.
    pub fn ids(&self) -> Vec<BundleId> {
        let mut ids: Vec<BundleId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn pending(&self, id: &BundleId) -> Option<PendingInstall> {
        self.in_flight.get(id).cloned()
    }

    pub fn begin_install(&mut self, id: BundleId, pending: PendingInstall) {
        self.in_flight.insert(id, pending);
    }

    /// Record a loaded bundle whose activators have not finished starting.
    pub fn insert_installing(&mut self, bundle: Arc<Bundle>) {
        self.entries.insert(
            bundle.id().clone(),
            BundleEntry {
                bundle,
                state: BundleState::Installing,
            },
        );
    }

    /// Settle an install that reached activation (successfully or not).
    pub fn finish_install(&mut self, id: &BundleId) {
        self.in_flight.remove(id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.state = BundleState::Active;
        }
    }

    /// Settle an install whose load failed. Nothing else was recorded.
    pub fn abandon_install(&mut self, id: &BundleId) {
        self.in_flight.remove(id);
    }

    /// Claim an active bundle for removal. `None` for absent, still
    /// installing or already stopping bundles.
    pub fn begin_remove(&mut self, id: &BundleId) -> Option<Arc<Bundle>> {
        if self.in_flight.contains_key(id) {
            return None;
        }
        let entry = self.entries.get_mut(id)?;
        if entry.state != BundleState::Active {
            return None;
        }
        entry.state = BundleState::Stopping;
        Some(Arc::clone(&entry.bundle))
    }

    pub fn abort_remove(&mut self, id: &BundleId) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.state = BundleState::Active;
        }
    }

    pub fn remove(&mut self, id: &BundleId) -> Option<Arc<Bundle>> {
        self.entries.remove(id).map(|entry| entry.bundle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
