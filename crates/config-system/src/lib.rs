//! Configuration system for the SpaceTechs scene runtime
//! Manages quality presets, performance thresholds, scene constants,
//! content-API settings and device capability detection

use std::time::Duration;

use serde::{Deserialize, Serialize};
use spacetechs_shared::{ConfigError, QualityTier};
use url::Url;

pub mod detection;
pub mod presets;

pub use detection::{classify, detect_capabilities, EnvironmentProbe, StaticProbe, WebGlReport};
pub use presets::{AnimationConfig, GeometryConfig, MaterialKind, MaterialPreset, SceneLayout};

#[cfg(target_arch = "wasm32")]
pub use detection::BrowserProbe;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Default content-API origin
pub const DEFAULT_API_BASE_URL: &str = "https://backend.spacetechs.net/api";

/// FPS thresholds driving tier selection and degradation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceThresholds {
    /// At or above: High tier
    pub excellent: f64,
    /// At or above: Medium tier; below: reduced quality
    pub good: f64,
    /// Below: low-FPS warning
    pub poor: f64,
    /// Below: degraded mode
    pub critical: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            excellent: 55.0,
            good: 45.0,
            poor: 30.0,
            critical: 20.0,
        }
    }
}

impl PerformanceThresholds {
    /// Pure fps-to-tier mapping; monotonically non-decreasing in `fps`
    pub fn tier_for_fps(&self, fps: f64) -> QualityTier {
        if fps >= self.excellent {
            QualityTier::High
        } else if fps >= self.good {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

/// Content-API client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub max_cache_entries: usize,
    /// Private/loopback hosts that may be contacted
    pub private_host_allowlist: Vec<String>,
}

impl ApiConfig {
    /// Build a configuration for `base_url`; the configured host is trusted
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: "URL has no host".to_string(),
            })?
            .to_string();

        Ok(Self {
            base_url: parsed,
            api_key: None,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(5 * 60),
            max_cache_entries: 100,
            private_host_allowlist: vec![host],
        })
    }

    /// Read `NEXT_PUBLIC_API_BASE_URL`, `API_KEY` and `NEXT_PUBLIC_API_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("NEXT_PUBLIC_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let api_key = lookup("API_KEY")
            .or_else(|| lookup("NEXT_PUBLIC_API_KEY"))
            .filter(|v| !v.is_empty());

        if api_key.is_none() && lookup("NODE_ENV").as_deref() == Some("production") {
            log::warn!("API key not found in environment variables");
        }

        let mut config = Self::new(&base_url)?;
        config.api_key = api_key;
        log::debug!("Content API configured for {}", config.base_url);
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_cache_entries(mut self, max_entries: usize) -> Self {
        self.max_cache_entries = max_entries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the private-host allowlist (an empty list denies every private host)
    pub fn with_private_allowlist(mut self, hosts: Vec<String>) -> Self {
        self.private_host_allowlist = hosts;
        self
    }

    /// Base URL without a trailing slash, used for string joins
    pub fn base_str(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_tier_for_fps_boundaries() {
        let thresholds = PerformanceThresholds::default();
        assert_eq!(thresholds.tier_for_fps(60.0), QualityTier::High);
        assert_eq!(thresholds.tier_for_fps(55.0), QualityTier::High);
        assert_eq!(thresholds.tier_for_fps(54.9), QualityTier::Medium);
        assert_eq!(thresholds.tier_for_fps(45.0), QualityTier::Medium);
        assert_eq!(thresholds.tier_for_fps(44.9), QualityTier::Low);
        assert_eq!(thresholds.tier_for_fps(0.0), QualityTier::Low);
    }

    #[test]
    fn test_tier_is_monotonic_in_fps() {
        let thresholds = PerformanceThresholds::default();
        let mut previous = QualityTier::Low;
        for tenths in 0..1200 {
            let tier = thresholds.tier_for_fps(tenths as f64 / 10.0);
            assert!(tier >= previous, "tier decreased at {} fps", tenths as f64 / 10.0);
            previous = tier;
        }
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_str(), DEFAULT_API_BASE_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.max_cache_entries, 100);
        assert_eq!(config.private_host_allowlist, vec!["backend.spacetechs.net".to_string()]);
    }

    #[test]
    fn test_from_lookup_prefers_server_key() {
        let vars: HashMap<&str, &str> = [
            ("NEXT_PUBLIC_API_BASE_URL", "http://localhost:4000/api"),
            ("API_KEY", "server-key"),
            ("NEXT_PUBLIC_API_KEY", "public-key"),
        ]
        .into_iter()
        .collect();

        let config = ApiConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("server-key"));
        assert_eq!(config.base_str(), "http://localhost:4000/api");
        assert_eq!(config.private_host_allowlist, vec!["localhost".to_string()]);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = ApiConfig::new("not a url");
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
    }
}
