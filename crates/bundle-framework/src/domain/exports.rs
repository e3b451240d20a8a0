//! Exported symbols of a loaded bundle.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::ServiceObject;

/// Symbol table a module loader yields for a bundle.
///
/// Cloning is cheap and clones share the same table, so every caller of an
/// idempotent install sees the identical exports.
#[derive(Clone, Default)]
pub struct BundleExports {
    symbols: Arc<HashMap<String, ServiceObject>>,
}

impl BundleExports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        Arc::make_mut(&mut self.symbols).insert(name.into(), Arc::new(value));
        self
    }

    /// Typed lookup; `None` when absent or of another type.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.symbols
            .get(name)
            .and_then(|symbol| Arc::clone(symbol).downcast::<T>().ok())
    }

    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<ServiceObject> {
        self.symbols.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Symbol names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether both handles share the same table.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.symbols, &other.symbols)
    }
}

impl fmt::Debug for BundleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleExports")
            .field("symbols", &self.names())
            .finish()
    }
}
