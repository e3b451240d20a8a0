//! Shared fixtures for the framework integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use bundle_framework::{
    Activator, ActivatorError, BundleContext, Framework, FrameworkConfig, ServiceProperties,
    ServiceRegistration, ServiceSource, StaticModuleLoader,
};

/// Activator that records its calls into a shared journal and can be told
/// to fail.
pub struct RecordingActivator {
    pub name: String,
    pub journal: Arc<Mutex<Vec<String>>>,
    pub fail_start: bool,
    pub fail_stop: bool,
}

impl RecordingActivator {
    pub fn new(name: &str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            fail_start: false,
            fail_stop: false,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }
}

#[async_trait]
impl Activator for RecordingActivator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, _context: &BundleContext) -> Result<(), ActivatorError> {
        self.journal.lock().push(format!("start:{}", self.name));
        if self.fail_start {
            return Err(ActivatorError::new(&self.name, "start refused"));
        }
        Ok(())
    }

    async fn stop(&self, _context: &BundleContext) -> Result<(), ActivatorError> {
        self.journal.lock().push(format!("stop:{}", self.name));
        if self.fail_stop {
            return Err(ActivatorError::new(&self.name, "stop refused"));
        }
        Ok(())
    }
}

/// Activator registering one `card` value service on start and
/// unregistering it on stop.
pub struct CardActivator {
    pub symbolic_name: String,
    pub registration: Mutex<Option<ServiceRegistration>>,
}

impl CardActivator {
    pub fn new(symbolic_name: &str) -> Self {
        Self {
            symbolic_name: symbolic_name.to_string(),
            registration: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Activator for CardActivator {
    async fn start(&self, context: &BundleContext) -> Result<(), ActivatorError> {
        let registration = context.register_service(
            "card",
            ServiceSource::value(self.symbolic_name.clone()),
            ServiceProperties::new().with("SymbolicName", self.symbolic_name.as_str()),
        );
        *self.registration.lock() = Some(registration);
        Ok(())
    }

    async fn stop(&self, _context: &BundleContext) -> Result<(), ActivatorError> {
        let registration = self.registration.lock().take();
        if let Some(registration) = registration {
            registration.unregister();
        }
        Ok(())
    }
}

pub fn framework_with(loader: &Arc<StaticModuleLoader>, config: FrameworkConfig) -> Framework {
    Framework::new(config, Arc::clone(loader) as Arc<dyn bundle_framework::ModuleLoader>).unwrap()
}

pub fn framework(loader: &Arc<StaticModuleLoader>) -> Framework {
    framework_with(loader, FrameworkConfig::default())
}
