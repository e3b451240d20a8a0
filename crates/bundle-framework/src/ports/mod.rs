//! Ports: the traits the framework drives (activators) and depends on
//! (module loaders).

pub mod inbound;
pub mod outbound;

pub use inbound::Activator;
pub use outbound::{LoadedModule, ModuleLoader};
