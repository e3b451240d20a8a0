//! Domain layer: identities and value types shared by every other layer.

pub mod bundle;
pub mod exports;
pub mod properties;
pub mod service;

pub use bundle::{Bundle, BundleId, BundleState};
pub use exports::BundleExports;
pub use properties::{ServiceProperties, CLASS_PROPERTY};
pub use service::{
    ServiceClass, ServiceFactory, ServiceKey, ServiceObject, ServiceReference,
    ServiceRegistration, ServiceSource,
};
