//! Server Settings
//!
//! Loaded from an optional `clinic.toml` plus `CLINIC__*` environment
//! overrides; clinical thresholds default to the named values on the
//! core config structs.

use crate::rate_limit::RateLimitConfig;
use alert_engine::RuleConfig;
use serde::Deserialize;
use session_lifecycle::VitalsConfig;

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Alert rule thresholds
    #[serde(default)]
    pub rules: RuleConfig,
    /// Vitals plausibility ranges
    #[serde(default)]
    pub vitals: VitalsConfig,
    /// REST rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rules: RuleConfig::default(),
            vitals: VitalsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("clinic").required(false))
            .add_source(config::Environment::with_prefix("CLINIC").separator("__"))
            .build()?
            .try_deserialize()
    }
}
