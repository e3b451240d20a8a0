//! # Bundle Framework - Dynamic Bundles over a Shared Service Registry
//!
//! A hierarchical container that installs self-contained units of
//! functionality ("bundles") at runtime, drives their lifecycle and exposes a
//! process-wide service registry through which bundles consume capabilities
//! provided by other bundles without compile-time coupling.
//!
//! ## Architecture
//!
//! - **Domain** (`domain/`): bundle identity, service references, attribute
//!   bags and exported symbols. No I/O.
//! - **Ports** (`ports/`): `Activator` (lifecycle participant, driven by the
//!   framework) and `ModuleLoader` (resolves a bundle identifier to its
//!   exports, driven port).
//! - **Registries** (`registry/`): the global bundle table, service registry
//!   and listener registry, each behind its own lock.
//! - **Contexts** (`context/`): an arena of context records and the
//!   `BundleContext` handle through which every operation is issued.
//! - **Bridge** (`bridge`): message-passing inlet that lets code outside the
//!   context tree install and uninstall bundles.
//! - **Adapters** (`adapters/`): an in-memory `StaticModuleLoader`.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  LifecycleCommand ──▶ CommandBridge ──▶ root  │ BundleContext tree
//!                 │            │                │
//!                 │            ├── /webapp/a    │──register_service──┐
//!                 │            └── /webapp/b    │                    ▼
//!                 └──────────────────────────────┘          ┌─────────────────┐
//!                         │ install_bundle                   │ ServiceRegistry │
//!                         ▼                                  └────────┬────────┘
//!                 ┌──────────────┐                                    │ fire
//!                 │ ModuleLoader │                           ┌────────▼─────────┐
//!                 └──────────────┘                           │ ListenerRegistry │
//!                                                            └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use bundle_framework::{Framework, FrameworkConfig, ServiceProperties, StaticModuleLoader};
//! use std::sync::Arc;
//!
//! let loader = Arc::new(StaticModuleLoader::new());
//! let framework = Framework::new(FrameworkConfig::default(), loader)?;
//! let root = framework.root();
//!
//! let (context, exports) = root.install_bundle("/webapp/userprofile").await?;
//! for reference in root.get_service_references("card", &ServiceProperties::new()) {
//!     let card = root.get_service(&reference, &[]);
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod bridge;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod framework;
pub mod ports;
pub mod registry;

pub use adapters::StaticModuleLoader;
pub use bridge::{BundleSelection, CommandBridge, CommandSender, LifecycleCommand};
pub use config::{FrameworkConfig, RemovalPolicy};
pub use context::{BundleContext, ContextId};
pub use domain::{
    Bundle, BundleExports, BundleId, BundleState, ServiceClass, ServiceKey, ServiceObject,
    ServiceProperties, ServiceReference, ServiceRegistration, ServiceSource, CLASS_PROPERTY,
};
pub use error::{ActivatorError, BridgeError, BundleError, ConfigError, LoadError};
pub use framework::Framework;
pub use ports::{Activator, LoadedModule, ModuleLoader};
pub use registry::{listener, ServiceEvent, ServiceListener};
