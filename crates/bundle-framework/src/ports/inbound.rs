//! Inbound port: lifecycle participants.

use async_trait::async_trait;

use crate::context::BundleContext;
use crate::error::ActivatorError;

/// A lifecycle participant owned by a bundle context.
///
/// `start` runs when the owning bundle is activated and typically calls
/// `register_service`; `stop` runs when it is deactivated. Failures propagate
/// to whoever triggered the transition.
#[async_trait]
pub trait Activator: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn start(&self, context: &BundleContext) -> Result<(), ActivatorError>;

    async fn stop(&self, context: &BundleContext) -> Result<(), ActivatorError>;
}
