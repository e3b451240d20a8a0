//! # Command Bridge
//!
//! The only way code outside the context tree drives bundle lifecycle. The
//! host holds a [`CommandSender`]; the bridge task applies each
//! [`LifecycleCommand`] to the root context in arrival order. Fire and
//! forget: outcomes are logged, never reported back to the issuer.
//!
//! ## Wire form
//!
//! ```text
//! {"command": "bundle.install",   "bundle": "/webapp/userprofile"}
//! {"command": "bundle.install",   "bundle": ["/webapp/a", "/webapp/b"]}
//! {"command": "bundle.uninstall", "bundle": "/webapp/userprofile"}
//! ```

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::context::BundleContext;
use crate::domain::BundleId;
use crate::error::BridgeError;
use crate::framework::Framework;

/// One identifier or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleSelection {
    One(BundleId),
    Many(Vec<BundleId>),
}

impl BundleSelection {
    #[must_use]
    pub fn into_vec(self) -> Vec<BundleId> {
        match self {
            Self::One(id) => vec![id],
            Self::Many(ids) => ids,
        }
    }
}

/// External lifecycle command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum LifecycleCommand {
    #[serde(rename = "bundle.install")]
    Install { bundle: BundleSelection },

    #[serde(rename = "bundle.uninstall")]
    Uninstall { bundle: BundleId },
}

impl LifecycleCommand {
    pub fn install(bundle: impl Into<BundleId>) -> Self {
        Self::Install {
            bundle: BundleSelection::One(bundle.into()),
        }
    }

    pub fn install_all<I, B>(bundles: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BundleId>,
    {
        Self::Install {
            bundle: BundleSelection::Many(bundles.into_iter().map(Into::into).collect()),
        }
    }

    pub fn uninstall(bundle: impl Into<BundleId>) -> Self {
        Self::Uninstall {
            bundle: bundle.into(),
        }
    }

    /// Parse the JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(raw).map_err(|e| BridgeError::Malformed(e.to_string()))
    }
}

/// Host-facing inlet of the bridge.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<LifecycleCommand>,
}

impl CommandSender {
    /// Queue a command, waiting for capacity.
    pub async fn send(&self, command: LifecycleCommand) -> Result<(), BridgeError> {
        self.tx.send(command).await.map_err(|_| BridgeError::Closed)
    }

    /// Queue a command without waiting.
    pub fn try_send(&self, command: LifecycleCommand) -> Result<(), BridgeError> {
        self.tx.try_send(command).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => BridgeError::Full,
            mpsc::error::TrySendError::Closed(_) => BridgeError::Closed,
        })
    }

    /// Queue a command from a thread outside the async runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn blocking_send(&self, command: LifecycleCommand) -> Result<(), BridgeError> {
        self.tx.blocking_send(command).map_err(|_| BridgeError::Closed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Root-context subscription to external lifecycle commands.
pub struct CommandBridge {
    root: BundleContext,
    rx: mpsc::Receiver<LifecycleCommand>,
}

impl CommandBridge {
    /// Create the bridge for `framework`'s root context, buffered to the
    /// configured command capacity.
    pub fn new(framework: &Framework) -> (CommandSender, Self) {
        let (tx, rx) = mpsc::channel(framework.config().command_capacity);
        (
            CommandSender { tx },
            Self {
                root: framework.root(),
                rx,
            },
        )
    }

    /// Apply commands until `shutdown` is set or every sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Command bridge started");

        loop {
            if *shutdown.borrow() {
                info!("Command bridge shutdown signal received");
                break;
            }

            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        info!("All command senders dropped, stopping bridge");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown channel closed, stopping bridge");
                        break;
                    }
                }
            }
        }
    }

    /// Apply a single command to the root context.
    pub async fn handle(&self, command: LifecycleCommand) {
        debug!(?command, "Lifecycle command received");

        match command {
            LifecycleCommand::Install { bundle } => {
                let ids = bundle.into_vec();
                let outcomes = join_all(ids.iter().map(|id| self.root.install_bundle(id))).await;
                for (id, outcome) in ids.iter().zip(outcomes) {
                    match outcome {
                        Ok(_) => info!(bundle = %id, "Bundle installed"),
                        Err(err) => error!(bundle = %id, error = %err, "Bundle install failed"),
                    }
                }
            }
            LifecycleCommand::Uninstall { bundle } => {
                info!(bundle = %bundle, "Uninstall bundle");
                match self.root.remove_bundle(&bundle).await {
                    Ok(()) => info!(bundle = %bundle, "Bundle uninstalled"),
                    Err(err) => error!(bundle = %bundle, error = %err, "Bundle uninstall failed"),
                }
            }
        }
    }
}
