//! Pipeline client configuration.

use std::time::Duration;

/// Retry policy for pipeline calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

/// HTTP pipeline client configuration.
#[derive(Debug, Clone)]
pub struct PipelineClientConfig {
    /// Base URL of the pipeline service
    pub base_url: String,
    /// Whole-request timeout for a generation call
    pub request_timeout: Duration,
    /// Timeout for health checks
    pub health_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Output sides must be multiples of this value
    pub spatial_modulus: u32,
    pub retry: RetryConfig,
}

impl Default for PipelineClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8200".to_string(),
            request_timeout: Duration::from_secs(600),
            health_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            spatial_modulus: 16,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: std::env::var("TTM_PIPELINE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            request_timeout: Duration::from_secs(
                std::env::var("TTM_PIPELINE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.request_timeout.as_secs()),
            ),
            health_timeout: defaults.health_timeout,
            connect_timeout: Duration::from_secs(
                std::env::var("TTM_PIPELINE_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.connect_timeout.as_secs()),
            ),
            spatial_modulus: std::env::var("TTM_PIPELINE_SPATIAL_MODULUS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m: &u32| *m > 0)
                .unwrap_or(defaults.spatial_modulus),
            retry: RetryConfig {
                max_retries: std::env::var("TTM_PIPELINE_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.max_retries),
                ..defaults.retry
            },
        }
    }
}
