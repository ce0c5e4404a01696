//! Gateway configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ARKALIA_SW_*)
//! 2. TOML config file (if ARKALIA_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Gateway configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ARKALIA_SW_*)
/// 2. TOML config file (if ARKALIA_SW_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// The eviction thresholds and sweep interval are policy constants carried
/// over from the original deployment; the defaults are load-bearing for
/// compatibility and should only be overridden deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via ARKALIA_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the gateway fronts; manifest paths resolve against it.
    ///
    /// Set via ARKALIA_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current store generation.
    ///
    /// Bumping this is the sole mechanism for invalidating all previously
    /// cached content. Set via ARKALIA_SW_CACHE_NAME.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Gateway version reported to GET_VERSION control messages.
    #[serde(default = "default_version")]
    pub version: String,

    /// Critical-path assets fetched and cached at install time.
    ///
    /// Changing this list requires a cache_name bump to take effect;
    /// old stores are never mutated in place.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Maximum entries per store before the sweep evicts.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Entry count the sweep prunes down to.
    #[serde(default = "default_retain_entries")]
    pub retain_entries: u64,

    /// Seconds between eviction sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// User-Agent string for upstream fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream fetch timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./arkalia-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_cache_name() -> String {
    "arkalia-luna-v3.0-phase1".into()
}

fn default_version() -> String {
    "3.0.1".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/assets/arkalia-luna-theme.css",
        "/assets/js/arkalia-assistant.js",
        "/assets/logo.svg",
        "/assets/favicon.svg",
        "/quick-start/",
        "/style-demo/",
        "/modules/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_entries() -> u64 {
    100
}

fn default_retain_entries() -> u64 {
    80
}

fn default_sweep_interval_secs() -> u64 {
    30 * 60
}

fn default_user_agent() -> String {
    "arkalia-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_name: default_cache_name(),
            version: default_version(),
            precache_manifest: default_precache_manifest(),
            max_entries: default_max_entries(),
            retain_entries: default_retain_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Upstream fetch timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ARKALIA_SW_`
    /// 2. TOML file from `ARKALIA_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ARKALIA_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ARKALIA_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
