//! User-profile bundle: card provider.

use std::sync::Arc;

use async_trait::async_trait;
use bundle_framework::{
    Activator, ActivatorError, BundleContext, BundleExports, LoadedModule, ServiceProperties,
    ServiceRegistration, ServiceSource,
};
use parking_lot::Mutex;
use tracing::info;

use super::{DashboardCard, CARD_CLASS};

/// (SymbolicName, Version, id) of every card this bundle provides.
pub const PROFILE_CARDS: [(&str, &str, &str); 2] = [
    ("media.dee.dcms.userprofile", "1.0.0", "profile-summary"),
    ("media.dee.dcms.userprofile", "1.0.0", "profile-activity"),
];

pub(super) fn module() -> LoadedModule {
    LoadedModule::new(
        BundleExports::new()
            .with("SymbolicName", PROFILE_CARDS[0].0.to_string())
            .with("Version", PROFILE_CARDS[0].1.to_string()),
    )
    .with_activator(Arc::new(ProfileActivator::default()))
}

/// Registers one factory-backed card per entry of [`PROFILE_CARDS`].
#[derive(Default)]
pub struct ProfileActivator {
    registrations: Mutex<Vec<ServiceRegistration>>,
}

#[async_trait]
impl Activator for ProfileActivator {
    fn name(&self) -> &str {
        "ProfileActivator"
    }

    async fn start(&self, context: &BundleContext) -> Result<(), ActivatorError> {
        let registrations: Vec<_> = PROFILE_CARDS
            .iter()
            .map(|&(symbolic_name, version, id)| {
                let source = ServiceSource::factory(move |consumer, args| DashboardCard {
                    symbolic_name: symbolic_name.to_string(),
                    version: version.to_string(),
                    id: id.to_string(),
                    instance_id: args.first().cloned(),
                    consumer: consumer.id(),
                });
                let properties = ServiceProperties::new()
                    .with("SymbolicName", symbolic_name)
                    .with("Version", version)
                    .with("id", id);
                context.register_service(CARD_CLASS, source, properties)
            })
            .collect();

        info!(context = %context.id(), cards = registrations.len(), "User profile cards registered");
        self.registrations.lock().extend(registrations);
        Ok(())
    }

    async fn stop(&self, context: &BundleContext) -> Result<(), ActivatorError> {
        let registrations = std::mem::take(&mut *self.registrations.lock());
        for registration in &registrations {
            registration.unregister();
        }
        info!(context = %context.id(), cards = registrations.len(), "User profile cards unregistered");
        Ok(())
    }
}
