//! Dashboard bundle: card consumer.

use std::sync::Arc;

use async_trait::async_trait;
use bundle_framework::{
    Activator, ActivatorError, BundleContext, BundleExports, LoadedModule, ServiceProperties,
    ServiceReference,
};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};

use super::{DashboardCard, CARD_CLASS, USERPROFILE_BUNDLE};

pub(super) fn module() -> LoadedModule {
    let panel = DashboardPanel::default();
    LoadedModule::new(BundleExports::new().with("panel", panel.clone()))
        .with_activator(Arc::new(DashboardActivator::new(panel)))
}

/// Cards currently shown by the dashboard. Exported as `panel`.
#[derive(Clone, Default)]
pub struct DashboardPanel {
    slots: Arc<Mutex<Vec<(Arc<ServiceReference>, Arc<DashboardCard>)>>>,
}

impl DashboardPanel {
    #[must_use]
    pub fn cards(&self) -> Vec<Arc<DashboardCard>> {
        self.slots.lock().iter().map(|(_, card)| Arc::clone(card)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Installs the card providers, then fills the panel with one instance of
/// every registered card.
pub struct DashboardActivator {
    panel: DashboardPanel,
    providers: Vec<&'static str>,
}

impl DashboardActivator {
    pub fn new(panel: DashboardPanel) -> Self {
        Self {
            panel,
            providers: vec![USERPROFILE_BUNDLE],
        }
    }
}

#[async_trait]
impl Activator for DashboardActivator {
    fn name(&self) -> &str {
        "DashboardActivator"
    }

    async fn start(&self, context: &BundleContext) -> Result<(), ActivatorError> {
        for provider in &self.providers {
            context
                .install_bundle(*provider)
                .await
                .map_err(|e| ActivatorError::new(self.name(), e.to_string()))?;
        }

        let references = context.get_service_references(CARD_CLASS, &ServiceProperties::new());
        let mut slots = Vec::with_capacity(references.len());
        for (instance, reference) in references.into_iter().enumerate() {
            match context.get_service_as::<DashboardCard>(&reference, &[json!(instance)]) {
                Some(card) => slots.push((reference, card)),
                None => warn!(
                    service_index = reference.service_index(),
                    "Card service is not a dashboard card, skipped"
                ),
            }
        }

        info!(context = %context.id(), cards = slots.len(), "Dashboard populated");
        *self.panel.slots.lock() = slots;
        Ok(())
    }

    async fn stop(&self, context: &BundleContext) -> Result<(), ActivatorError> {
        let slots = std::mem::take(&mut *self.panel.slots.lock());
        for (reference, _) in &slots {
            context.unget_service(reference);
        }
        info!(context = %context.id(), released = slots.len(), "Dashboard cleared");
        Ok(())
    }
}
