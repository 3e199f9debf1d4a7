//! homing.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by [`HomingConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("resolver.concurrency_limit must be at least 1")]
    ZeroConcurrency,

    #[error("inventory.server_url_version must not be empty")]
    EmptyVersion,

    #[error("inventory.server_url must not be empty")]
    EmptyServerUrl,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HomingConfig {
    pub inventory: InventoryConfig,
    pub cache: CacheConfig,
    pub costs: CostConfig,
    pub resolver: ResolverConfig,
}

/// Where the inventory system lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InventoryConfig {
    /// Base URL up to, and not including, the version segment.
    pub server_url: String,
    /// API version in `v#` form.
    pub server_url_version: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub username: String,
    pub password: String,
    pub from_app_id: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            server_url: "http://controller:8080/aai".to_string(),
            server_url_version: "v10".to_string(),
            timeout_secs: 30,
            retries: 3,
            username: String::new(),
            password: String::new(),
            from_app_id: "CONDUCTOR".to_string(),
        }
    }
}

impl InventoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Version segment with any trailing slash removed.
    pub fn version(&self) -> &str {
        self.server_url_version.trim_end_matches('/')
    }
}

/// Refresh intervals for the region and complex caches, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub refresh_interval_minutes: u64,
    pub complex_refresh_interval_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: 1440,
            complex_refresh_interval_minutes: 1440,
        }
    }
}

impl CacheConfig {
    pub fn region_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }

    pub fn complex_ttl(&self) -> Duration {
        Duration::from_secs(self.complex_refresh_interval_minutes.saturating_mul(60))
    }
}

/// Base cost assigned to each candidate kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CostConfig {
    pub cloud_candidate_cost: f64,
    pub service_candidate_cost: f64,
    pub transport_candidate_cost: f64,
    /// Replaces the base cost when a candidate is the existing placement.
    pub existing_placement_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cloud_candidate_cost: 2.0,
            service_candidate_cost: 1.0,
            transport_candidate_cost: 1.0,
            existing_placement_cost: -8000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of demands resolved in parallel.
    pub concurrency_limit: usize,
    /// Flavor/capability-aware scheduling.
    pub capability_aware: bool,
    /// Region version that has SR-IOV automation available.
    pub sriov_automation_version: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 8,
            capability_aware: false,
            sriov_automation_version: "X.Y".to_string(),
        }
    }
}

impl HomingConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HomingConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.inventory.version().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        if self.inventory.base_url().is_empty() {
            return Err(ConfigError::EmptyServerUrl);
        }
        Ok(())
    }
}
