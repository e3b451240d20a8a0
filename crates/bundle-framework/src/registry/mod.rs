//! # Process-Wide Registries
//!
//! The only state shared across contexts. Each table sits behind its own
//! lock, held for the duration of a structural mutation and never across an
//! `.await`, a listener callback or a service factory.

mod bundles;
pub mod listeners;
pub mod services;

pub(crate) use bundles::{BundleTable, PendingInstall};
pub use listeners::{listener, ListenerRegistry, ServiceEvent, ServiceListener};
pub use services::ServiceRegistry;
