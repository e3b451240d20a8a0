//! # Runtime Configuration
//!
//! Framework settings plus the host-only knobs: log filter and the bundles
//! installed at startup.

use bundle_framework::{BundleId, ConfigError, FrameworkConfig};

/// Default log filter when neither `DCMS_LOG_LEVEL` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bundle installed at startup when `DCMS_AUTOINSTALL` is unset.
pub const DEFAULT_AUTOINSTALL: &str = "/webapp/dashboard";

/// Complete host configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Framework configuration.
    pub framework: FrameworkConfig,
    /// `tracing` env-filter directive.
    pub log_level: String,
    /// Bundles installed into the root context at startup.
    pub autoinstall: Vec<BundleId>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            framework: FrameworkConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            autoinstall: vec![BundleId::from(DEFAULT_AUTOINSTALL)],
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - everything read by [`FrameworkConfig::from_env`]
    /// - `DCMS_LOG_LEVEL`, falling back to `RUST_LOG` (default: info)
    /// - `DCMS_AUTOINSTALL`: comma separated bundle identifiers; empty
    ///   disables auto-install (default: /webapp/dashboard)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            framework: FrameworkConfig::from_lookup(&lookup)?,
            ..Self::default()
        };

        if let Some(level) = lookup("DCMS_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            if !level.trim().is_empty() {
                config.log_level = level.trim().to_string();
            }
        }

        if let Some(list) = lookup("DCMS_AUTOINSTALL") {
            config.autoinstall = parse_bundle_list(&list);
        }

        Ok(config)
    }
}

fn parse_bundle_list(raw: &str) -> Vec<BundleId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(BundleId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_framework::RemovalPolicy;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.autoinstall, vec![BundleId::from("/webapp/dashboard")]);
        assert_eq!(config.framework.removal_policy, RemovalPolicy::Detach);
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warn"),
            ("DCMS_LOG_LEVEL", "debug,bundle_framework=trace"),
            ("DCMS_AUTOINSTALL", " /webapp/a, ,/webapp/b "),
            ("DCMS_REMOVAL_POLICY", "cascade"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, "debug,bundle_framework=trace");
        assert_eq!(
            config.autoinstall,
            vec![BundleId::from("/webapp/a"), BundleId::from("/webapp/b")]
        );
        assert_eq!(config.framework.removal_policy, RemovalPolicy::Cascade);
    }

    #[test]
    fn test_rust_log_fallback_and_empty_autoinstall() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[("RUST_LOG", "warn"), ("DCMS_AUTOINSTALL", "")]))
                .unwrap();
        assert_eq!(config.log_level, "warn");
        assert!(config.autoinstall.is_empty());
    }

    #[test]
    fn test_framework_errors_propagate() {
        let err = RuntimeConfig::from_lookup(lookup(&[("DCMS_COMMAND_CAPACITY", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCommandCapacity);
    }
}
