//! Error types for the bundle framework.
//!
//! Every error here is `Clone`: a single in-flight install hands the same
//! outcome to every caller waiting on it.

use thiserror::Error;

use crate::domain::BundleId;

/// Failure reported by a `ModuleLoader`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no module is defined for {0}")]
    NotFound(BundleId),

    #[error("module {bundle} failed to evaluate: {reason}")]
    Failed { bundle: BundleId, reason: String },

    #[error("loading {bundle} timed out after {after_ms}ms")]
    TimedOut { bundle: BundleId, after_ms: u64 },

    #[error("loading {0} was cancelled")]
    Cancelled(BundleId),
}

/// Failure raised by an activator's `start` or `stop` hook.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("activator {activator}: {reason}")]
pub struct ActivatorError {
    /// Name of the activator that failed.
    pub activator: String,
    /// Human readable cause.
    pub reason: String,
}

impl ActivatorError {
    pub fn new(activator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            activator: activator.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by `install_bundle` / `remove_bundle`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// The module loader could not resolve the bundle. Nothing was created.
    #[error("failed to load bundle {bundle}: {source}")]
    Load {
        bundle: BundleId,
        #[source]
        source: LoadError,
    },

    /// An activator failed while the bundle was starting. The bundle stays
    /// installed; partially started activators are not rolled back.
    #[error("bundle {bundle} failed to start: {source}")]
    Start {
        bundle: BundleId,
        #[source]
        source: ActivatorError,
    },

    /// An activator failed while the bundle was stopping. The removal was
    /// aborted and the bundle is still installed.
    #[error("bundle {bundle} failed to stop: {source}")]
    Stop {
        bundle: BundleId,
        #[source]
        source: ActivatorError,
    },
}

impl BundleError {
    /// Identifier of the bundle the error is about.
    #[must_use]
    pub fn bundle(&self) -> &BundleId {
        match self {
            Self::Load { bundle, .. } | Self::Start { bundle, .. } | Self::Stop { bundle, .. } => {
                bundle
            }
        }
    }
}

/// Errors from the command bridge inlet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The bridge task is gone; the command was not delivered.
    #[error("command bridge closed")]
    Closed,

    /// The inlet is at capacity (only from `try_send`).
    #[error("command bridge is full")]
    Full,

    #[error("malformed lifecycle command: {0}")]
    Malformed(String),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("command capacity must be greater than zero")]
    ZeroCommandCapacity,

    #[error("unknown removal policy '{0}' (expected 'detach' or 'cascade')")]
    UnknownRemovalPolicy(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
