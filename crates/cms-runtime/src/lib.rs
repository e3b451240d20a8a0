//! # CMS Runtime
//!
//! Host process for the bundle framework.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Build the framework over the built-in bundle catalog
//! 3. Attach service event logging to the root context
//! 4. Install the auto-install bundles
//! 5. Spawn the command bridge and the stdin command source
//!
//! Shutdown signals the bridge, cancels in-flight loads, then removes every
//! installed bundle.

pub mod catalog;
pub mod commands;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use bundle_framework::{
    listener, BundleContext, CommandSender, Framework, ServiceEvent, ServiceReference,
};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use config::RuntimeConfig;

/// The running host: framework, command bridge and shutdown channel.
pub struct CmsRuntime {
    config: RuntimeConfig,
    framework: Framework,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl CmsRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        info!("Creating CMS runtime");
        let framework = Framework::new(config.framework.clone(), catalog::builtin_loader())
            .context("Invalid framework configuration")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            framework,
            shutdown_tx,
            shutdown_rx,
            bridge: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    #[must_use]
    pub fn root(&self) -> BundleContext {
        self.framework.root()
    }

    /// Run the startup sequence and return the command inlet.
    pub async fn start(&self) -> Result<CommandSender> {
        info!("===========================================");
        info!("  DCMS Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Removal policy: {}", self.config.framework.removal_policy.as_str());
        info!("===========================================");

        let root = self.root();
        root.add_service_listener(ServiceEvent::Registered, listener(log_event(ServiceEvent::Registered)));
        root.add_service_listener(ServiceEvent::Unregistered, listener(log_event(ServiceEvent::Unregistered)));

        self.autoinstall(&root).await;

        let (sender, handle) = self.framework.spawn_command_bridge(self.shutdown_rx.clone());
        *self.bridge.lock() = Some(handle);

        info!(
            bundles = self.framework.bundle_count(),
            service_classes = self.framework.service_class_count(),
            "Runtime started"
        );
        Ok(sender)
    }

    async fn autoinstall(&self, root: &BundleContext) {
        if self.config.autoinstall.is_empty() {
            return;
        }
        info!(bundles = ?self.config.autoinstall, "Auto-installing bundles");

        let outcomes = join_all(
            self.config
                .autoinstall
                .iter()
                .map(|id| root.install_bundle(id)),
        )
        .await;
        for (id, outcome) in self.config.autoinstall.iter().zip(outcomes) {
            if let Err(e) = outcome {
                error!(bundle = %id, error = %e, "Auto-install failed");
            }
        }
    }

    /// Feed JSON-lines commands from stdin into `sender` on a dedicated
    /// thread. The thread ends with stdin or the bridge.
    pub fn attach_stdin(&self, sender: CommandSender) -> Result<()> {
        std::thread::Builder::new()
            .name("dcms-stdin".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                let stats = commands::forward_lines(stdin.lock(), &sender);
                info!(
                    forwarded = stats.forwarded,
                    rejected = stats.rejected,
                    "Stdin command source finished"
                );
            })
            .context("Failed to spawn stdin command reader")?;
        Ok(())
    }

    /// Stop the bridge, then remove every installed bundle.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        self.framework.cancel_pending_loads();

        let bridge = self.bridge.lock().take();
        if let Some(handle) = bridge {
            if let Err(e) = handle.await {
                warn!(error = %e, "Command bridge task ended abnormally");
            }
        }

        // Root children first, then anything a detaching removal left behind.
        let root = self.root();
        let mut order: Vec<_> = root.children().into_iter().map(|(id, _)| id).collect();
        order.extend(self.framework.installed_bundles());
        for id in order {
            if let Err(e) = root.remove_bundle(&id).await {
                error!(bundle = %id, error = %e, "Bundle removal failed during shutdown");
            }
        }

        info!(
            remaining_bundles = self.framework.bundle_count(),
            "Shutdown complete"
        );
    }
}

fn log_event(event: ServiceEvent) -> impl Fn(&Arc<ServiceReference>) + Send + Sync + 'static {
    move |reference: &Arc<ServiceReference>| {
        info!(
            event = event.as_str(),
            class = %reference.class(),
            service_index = reference.service_index(),
            owner = %reference.owner(),
            "Service event"
        );
    }
}
