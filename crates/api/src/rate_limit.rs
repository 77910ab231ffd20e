//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Rate limits callers by IP using tower_governor. The Generic Cell Rate
//! Algorithm enforces quotas accurately without background processes.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Type alias for the governor config with default settings
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

fn default_per_second() -> u64 {
    1
}

fn default_burst_size() -> u32 {
    20
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds per replenished request
    #[serde(default = "default_per_second")]
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

impl RateLimitConfig {
    /// Stricter preset for deployments exposing the API beyond the clinic LAN
    pub fn strict() -> Self {
        Self {
            per_second: 2,
            burst_size: 5,
        }
    }
}

/// Create a rate limiting governor config
///
/// Returns an Arc wrapped config that can be used with GovernorLayer.
/// Uses PeerIpKeyExtractor by default. Requires service to use
/// `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.
///
/// Adds X-RateLimit-* headers to responses for quota visibility.
pub fn create_governor_config(config: &RateLimitConfig) -> Arc<DefaultGovernorConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.per_second)
            .burst_size(config.burst_size)
            .use_headers()
            .finish()
            .expect("governor config with non-zero quota"),
    )
}
