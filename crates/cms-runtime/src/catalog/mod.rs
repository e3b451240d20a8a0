//! # Built-in Bundle Catalog
//!
//! The web application's bundles, defined on a [`StaticModuleLoader`]:
//!
//! - `/webapp/userprofile` registers the user-profile dashboard cards.
//! - `/webapp/dashboard` installs the card providers it needs and consumes
//!   every card through the service registry.

mod dashboard;
mod userprofile;

use std::sync::Arc;

use bundle_framework::{ContextId, StaticModuleLoader};
use serde_json::Value;

pub use dashboard::{DashboardActivator, DashboardPanel};
pub use userprofile::{ProfileActivator, PROFILE_CARDS};

/// Service class of dashboard cards.
pub const CARD_CLASS: &str = "d.cms.ui.component.Dashboard.Card";

pub const USERPROFILE_BUNDLE: &str = "/webapp/userprofile";
pub const DASHBOARD_BUNDLE: &str = "/webapp/dashboard";

/// A card instance, produced once per consuming context.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardCard {
    pub symbolic_name: String,
    pub version: String,
    pub id: String,
    /// First factory argument, if any.
    pub instance_id: Option<Value>,
    /// Context the instance was created for.
    pub consumer: ContextId,
}

/// Loader with every built-in bundle defined.
pub fn builtin_loader() -> Arc<StaticModuleLoader> {
    let loader = Arc::new(StaticModuleLoader::new());
    define_builtins(&loader);
    loader
}

pub fn define_builtins(loader: &StaticModuleLoader) {
    loader.define(USERPROFILE_BUNDLE, userprofile::module);
    loader.define(DASHBOARD_BUNDLE, dashboard::module);
}
