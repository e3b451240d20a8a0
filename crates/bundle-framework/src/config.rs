//! # Framework Configuration
//!
//! Runtime parameters of the bundle container. All values have sane
//! defaults and can be overridden through `DCMS_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default timeout applied to a single module load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of lifecycle commands buffered by the command bridge.
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What happens to a bundle's descendants and services when it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Only the bundle itself is stopped and forgotten. Bundles it installed
    /// stay in the bundle table but are no longer reachable through the
    /// tree, and the services it registered stay registered.
    #[default]
    Detach,
    /// Descendants are removed depth-first first, then every service owned
    /// by a removed context is unregistered.
    Cascade,
}

impl RemovalPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detach => "detach",
            Self::Cascade => "cascade",
        }
    }
}

impl FromStr for RemovalPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detach" => Ok(Self::Detach),
            "cascade" => Ok(Self::Cascade),
            other => Err(ConfigError::UnknownRemovalPolicy(other.to_string())),
        }
    }
}

/// Complete framework configuration.
#[derive(Debug, Clone)]
pub struct FrameworkConfig {
    /// Cleanup policy for `remove_bundle`.
    pub removal_policy: RemovalPolicy,
    /// Upper bound on a single module load. `None` waits forever.
    pub load_timeout: Option<Duration>,
    /// Bounded capacity of the command bridge inlet.
    pub command_capacity: usize,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            removal_policy: RemovalPolicy::Detach,
            load_timeout: Some(DEFAULT_LOAD_TIMEOUT),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl FrameworkConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DCMS_REMOVAL_POLICY`: `detach` or `cascade` (default: detach)
    /// - `DCMS_LOAD_TIMEOUT_MS`: module load timeout, `0` disables (default: 30000)
    /// - `DCMS_COMMAND_CAPACITY`: command bridge capacity (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(policy) = lookup("DCMS_REMOVAL_POLICY") {
            config.removal_policy = policy.parse()?;
        }

        if let Some(value) = lookup("DCMS_LOAD_TIMEOUT_MS") {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "DCMS_LOAD_TIMEOUT_MS",
                value: value.clone(),
            })?;
            config.load_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(value) = lookup("DCMS_COMMAND_CAPACITY") {
            config.command_capacity =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DCMS_COMMAND_CAPACITY",
                    value: value.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that `Default` cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_capacity == 0 {
            return Err(ConfigError::ZeroCommandCapacity);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }
}
