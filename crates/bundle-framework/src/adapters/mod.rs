//! Adapters implementing the outbound ports.

mod static_loader;

pub use static_loader::{ModuleFactory, StaticModuleLoader};
