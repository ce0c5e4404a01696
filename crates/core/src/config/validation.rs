//! Configuration validation rules.
//!
//! This module provides validation logic for `GatewayConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::GatewayConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl GatewayConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not a parseable URL
    /// - `cache_name` or `user_agent` is empty
    /// - `max_entries` is 0 or `retain_entries` exceeds it
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - a manifest path does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.origin).is_err() {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be a valid URL".into() });
        }

        if self.cache_name.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_name".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_entries == 0 {
            return Err(ConfigError::Invalid { field: "max_entries".into(), reason: "must be greater than 0".into() });
        }
        if self.retain_entries > self.max_entries {
            return Err(ConfigError::Invalid {
                field: "retain_entries".into(),
                reason: "must not exceed max_entries".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        for path in &self.precache_manifest {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "precache_manifest".into(),
                    reason: format!("path {path:?} must start with '/'"),
                });
            }
        }

        if self.sweep_interval_secs == 0 {
            tracing::warn!("sweep_interval_secs is 0; the eviction sweep will spin continuously");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = GatewayConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_cache_name() {
        let config = GatewayConfig { cache_name: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_name"));
    }

    #[test]
    fn test_validate_max_entries_zero() {
        let config = GatewayConfig { max_entries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_entries"));
    }

    #[test]
    fn test_validate_retain_exceeds_max() {
        let config = GatewayConfig { max_entries: 50, retain_entries: 80, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "retain_entries"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = GatewayConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = GatewayConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_relative_manifest_path() {
        let config = GatewayConfig { precache_manifest: vec!["index.html".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "precache_manifest"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = GatewayConfig { max_entries: 1, retain_entries: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
