//! Bundle identity and installed-bundle records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ContextId;
use crate::domain::BundleExports;

/// Opaque, process-wide unique bundle identifier (typically a module path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BundleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BundleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&BundleId> for BundleId {
    fn from(id: &BundleId) -> Self {
        id.clone()
    }
}

/// Lifecycle state of a bundle identifier.
///
/// `Uninstalled → Installing → Active → Stopping → Uninstalled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    /// Not present in the bundle table.
    Uninstalled,
    /// Module load or activator start in progress.
    Installing,
    /// Loaded and activated.
    Active,
    /// Activators are being stopped.
    Stopping,
}

/// An installed bundle.
#[derive(Debug)]
pub struct Bundle {
    id: BundleId,
    context: ContextId,
    exports: BundleExports,
    installed_at: DateTime<Utc>,
}

impl Bundle {
    pub(crate) fn new(id: BundleId, context: ContextId, exports: BundleExports) -> Self {
        Self {
            id,
            context,
            exports,
            installed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &BundleId {
        &self.id
    }

    /// Arena key of the bundle's own context.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn exports(&self) -> &BundleExports {
        &self.exports
    }

    #[must_use]
    pub fn installed_at(&self) -> DateTime<Utc> {
        self.installed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_id_display_and_serde() {
        let id = BundleId::from("/webapp/userprofile");
        assert_eq!(id.to_string(), "/webapp/userprofile");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/webapp/userprofile\"");
        let back: BundleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_bundle_records_install_time() {
        let before = Utc::now();
        let bundle = Bundle::new(
            BundleId::from("/webapp/a"),
            ContextId::ROOT,
            BundleExports::default(),
        );
        assert!(bundle.installed_at() >= before);
        assert_eq!(bundle.context_id(), ContextId::ROOT);
    }
}
